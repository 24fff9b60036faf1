//! Open long position and the trade it becomes once closed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    /// Signal price at entry.
    pub entry_price: f64,
    /// Entry price after slippage.
    pub entry_fill: f64,
    pub entry_date: NaiveDate,
    pub entry_index: usize,
}

impl Position {
    /// Gross return if the position were sold at `price` without costs.
    pub fn unrealized_return(&self, price: f64) -> f64 {
        if self.entry_fill > 0.0 {
            price / self.entry_fill - 1.0
        } else {
            0.0
        }
    }

    pub fn close(
        self,
        exit_price: f64,
        exit_date: NaiveDate,
        exit_index: usize,
        return_pct: f64,
    ) -> ClosedTrade {
        ClosedTrade {
            entry_date: self.entry_date,
            exit_date,
            entry_index: self.entry_index,
            exit_index,
            entry_price: self.entry_price,
            exit_price,
            return_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Net return as a fraction (0.1 = +10%).
    #[serde(rename = "return")]
    pub return_pct: f64,
}

impl ClosedTrade {
    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }

    pub fn is_win(&self) -> bool {
        self.return_pct > 0.0
    }
}
