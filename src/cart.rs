//! Per-session shopping cart of package lines.
//!
//! The cart only stores references. Availability is always checked against the
//! package's current `available_seats`, which callers load before mutating.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Distinguishes lines that point at the same package.
    pub token: Uuid,
    pub package_id: i32,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub lines: Vec<CartLine>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("not enough seats: {available} available, {queued} already in cart")]
    ExceedsAvailability { available: i32, queued: u32 },
    #[error("cart line not found")]
    LineNotFound,
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::LineNotFound => AppError::NotFound("Cart line"),
            other => AppError::validation(other.to_string()),
        }
    }
}

fn fits(requested: u32, queued: u32, available: i32) -> bool {
    i64::from(requested) + i64::from(queued) <= i64::from(available)
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, token: Uuid) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.token == token)
    }

    /// Seats already queued for `package_id`, optionally ignoring one line.
    fn queued_except(&self, package_id: i32, skip: Option<Uuid>) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.package_id == package_id && Some(l.token) != skip)
            .map(|l| l.quantity)
            .sum()
    }

    pub fn queued_quantity(&self, package_id: i32) -> u32 {
        self.queued_except(package_id, None)
    }

    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn add(
        &mut self,
        package_id: i32,
        quantity: u32,
        available_seats: i32,
    ) -> Result<Uuid, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        let queued = self.queued_quantity(package_id);
        if !fits(quantity, queued, available_seats) {
            return Err(CartError::ExceedsAvailability {
                available: available_seats,
                queued,
            });
        }

        let token = Uuid::new_v4();
        self.lines.push(CartLine {
            token,
            package_id,
            quantity,
        });
        Ok(token)
    }

    pub fn update_quantity(
        &mut self,
        token: Uuid,
        quantity: u32,
        available_seats: i32,
    ) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        let package_id = self.line(token).ok_or(CartError::LineNotFound)?.package_id;
        let queued = self.queued_except(package_id, Some(token));
        if !fits(quantity, queued, available_seats) {
            return Err(CartError::ExceedsAvailability {
                available: available_seats,
                queued,
            });
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.token == token) {
            line.quantity = quantity;
        }
        Ok(())
    }

    pub fn remove(&mut self, token: Uuid) -> Result<CartLine, CartError> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.token == token)
            .ok_or(CartError::LineNotFound)?;
        Ok(self.lines.remove(idx))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
