use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dish on the restaurant menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: u64,
    pub name: String,
    pub price: Decimal,
    pub menu_item_description: String,
}

/// Request model for adding a dish to the menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMenuItemRequest {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub menu_item_description: String,
}

/// A validated menu item that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewMenuItem {
    pub name: String,
    pub price: Decimal,
    pub menu_item_description: String,
}

impl MenuItem {
    pub fn from_new(id: u64, item: NewMenuItem) -> Self {
        Self {
            id,
            name: item.name,
            price: item.price,
            menu_item_description: item.menu_item_description,
        }
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
