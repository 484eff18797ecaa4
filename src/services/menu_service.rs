use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    CreateMenuItemRequest, MenuItem, NewMenuItem, ServiceError, ServiceResult, Validate,
};
use crate::repositories::MenuRepository;

/// Dishes seeded into an empty menu
fn sample_menu() -> Vec<NewMenuItem> {
    vec![
        NewMenuItem {
            name: "Greek Salad".to_string(),
            price: dec!(12.99),
            menu_item_description: "Crispy lettuce, peppers, olives and Chicago-style feta, \
                                    garnished with garlic and rosemary croutons."
                .to_string(),
        },
        NewMenuItem {
            name: "Bruschetta".to_string(),
            price: dec!(7.99),
            menu_item_description: "Grilled bread smeared with garlic, seasoned with salt \
                                    and olive oil, topped with fresh tomatoes."
                .to_string(),
        },
        NewMenuItem {
            name: "Grilled Fish".to_string(),
            price: dec!(20.00),
            menu_item_description: "Catch of the day, grilled over charcoal with lemon \
                                    and herbs."
                .to_string(),
        },
        NewMenuItem {
            name: "Pasta".to_string(),
            price: dec!(18.99),
            menu_item_description: "House-made pasta tossed in a rich tomato and basil sauce."
                .to_string(),
        },
        NewMenuItem {
            name: "Lemon Dessert".to_string(),
            price: dec!(6.99),
            menu_item_description: "Straight from grandma's recipe book, every ingredient \
                                    sourced locally."
                .to_string(),
        },
    ]
}

/// Menu browsing plus the admin-side item lifecycle
pub struct MenuService {
    repository: Arc<dyn MenuRepository>,
}

impl MenuService {
    pub fn new(repository: Arc<dyn MenuRepository>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self))]
    pub async fn list_menu(&self) -> ServiceResult<Vec<MenuItem>> {
        Ok(self.repository.find_all().await?)
    }

    #[instrument(skip(self))]
    pub async fn get_menu_item(&self, id: u64) -> ServiceResult<MenuItem> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::MenuItemNotFound { id })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_menu_item(&self, request: &CreateMenuItemRequest) -> ServiceResult<MenuItem> {
        let item = request.validate()?;
        let created = self.repository.create(item).await?;

        crate::info_with_trace!(menu_item_id = created.id, "Menu item created");
        Ok(created)
    }

    /// Seed the sample menu when no items exist; returns how many were added
    #[instrument(skip(self))]
    pub async fn seed_sample_menu(&self) -> ServiceResult<usize> {
        if self.repository.count().await? > 0 {
            crate::info_with_trace!("Menu already populated, skipping seed");
            return Ok(0);
        }

        let items = sample_menu();
        let seeded = items.len();
        for item in items {
            self.repository.create(item).await?;
        }

        crate::info_with_trace!(seeded, "Seeded sample menu");
        Ok(seeded)
    }
}
