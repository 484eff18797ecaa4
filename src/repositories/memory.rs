use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::{BookingRepository, MenuRepository, UserRepository};
use crate::models::{
    slot_key, Booking, MenuItem, NewBooking, NewMenuItem, NewUser, RepositoryError,
    RepositoryResult, User,
};

/// Rows of one entity kept in id order, plus its id counter
struct Table<T> {
    rows: BTreeMap<u64, T>,
    last_id: u64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Default)]
struct BookingTable {
    table: Table<Booking>,
    by_slot: HashMap<String, u64>,
}

#[derive(Default)]
struct UserTable {
    table: Table<User>,
    by_username: HashMap<String, u64>,
}

/// Process-local data store backing every repository trait.
///
/// Each collection sits behind its own lock. Uniqueness checks and inserts run
/// under a single write guard, so racing creates for the same key cannot both
/// succeed.
#[derive(Default)]
pub struct InMemoryStore {
    bookings: RwLock<BookingTable>,
    menu_items: RwLock<Table<MenuItem>>,
    users: RwLock<UserTable>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    #[instrument(skip(self, booking), fields(slot_key = %booking.slot_key()))]
    async fn create(&self, booking: NewBooking) -> RepositoryResult<Booking> {
        let key = booking.slot_key();
        let mut bookings = self.bookings.write().await;

        if bookings.by_slot.contains_key(&key) {
            return Err(RepositoryError::Conflict {
                message: format!("slot {} is already booked", key),
            });
        }

        let id = bookings.table.next_id();
        let booking = Booking::from_new(id, booking);
        bookings.by_slot.insert(key, id);
        bookings.table.rows.insert(id, booking.clone());

        debug!(booking_id = id, "Stored booking");
        Ok(booking)
    }

    async fn find_by_slot(&self, date: NaiveDate, slot: &str) -> RepositoryResult<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .by_slot
            .get(&slot_key(date, slot))
            .and_then(|id| bookings.table.rows.get(id))
            .cloned())
    }

    async fn find_by_date(&self, date: NaiveDate) -> RepositoryResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .table
            .rows
            .values()
            .filter(|booking| booking.reservation_date == date)
            .cloned()
            .collect())
    }

    async fn find_by_guest_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> RepositoryResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut matches: Vec<Booking> = bookings
            .table
            .rows
            .values()
            .filter(|booking| booking.matches_guest(first_name, last_name))
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            (a.reservation_date, &a.reservation_slot, a.id).cmp(&(
                b.reservation_date,
                &b.reservation_slot,
                b.id,
            ))
        });
        Ok(matches)
    }
}

#[async_trait]
impl MenuRepository for InMemoryStore {
    async fn find_all(&self) -> RepositoryResult<Vec<MenuItem>> {
        Ok(self.menu_items.read().await.rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<MenuItem>> {
        Ok(self.menu_items.read().await.rows.get(&id).cloned())
    }

    #[instrument(skip(self, item), fields(name = %item.name))]
    async fn create(&self, item: NewMenuItem) -> RepositoryResult<MenuItem> {
        let mut menu_items = self.menu_items.write().await;
        let id = menu_items.next_id();
        let menu_item = MenuItem::from_new(id, item);
        menu_items.rows.insert(id, menu_item.clone());

        debug!(menu_item_id = id, "Stored menu item");
        Ok(menu_item)
    }

    async fn count(&self) -> RepositoryResult<usize> {
        Ok(self.menu_items.read().await.rows.len())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        let mut users = self.users.write().await;

        if users.by_username.contains_key(&user.username) {
            return Err(RepositoryError::Conflict {
                message: format!("username {} is already taken", user.username),
            });
        }

        let id = users.table.next_id();
        let user = User::from_new(id, user, Utc::now());
        users.by_username.insert(user.username.clone(), id);
        users.table.rows.insert(id, user.clone());

        debug!(user_id = id, "Stored user");
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .by_username
            .get(username)
            .and_then(|id| users.table.rows.get(id))
            .cloned())
    }

    async fn exists(&self, username: &str) -> RepositoryResult<bool> {
        Ok(self.users.read().await.by_username.contains_key(username))
    }
}
