#[cfg(test)]
mod repository_tests {
    use async_trait::async_trait;
    use aws_sdk_dynamodb::types::AttributeValue;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    use crate::models::{Booking, MenuItem, NewBooking, RepositoryError, RepositoryResult, User};
    use crate::repositories::dynamodb::{map_dynamodb_error, test_client};
    use crate::repositories::*;

    /// Stand-in sequence; conversion tests never reach the network
    struct FixedSequence;

    #[async_trait]
    impl IdSequence for FixedSequence {
        async fn next_id(&self, _sequence: &str) -> RepositoryResult<u64> {
            Ok(1)
        }
    }

    fn ids() -> Arc<dyn IdSequence> {
        Arc::new(FixedSequence)
    }

    fn create_test_booking() -> Booking {
        Booking::from_new(
            42,
            NewBooking {
                first_name: "John".to_string(),
                last_name: "Doe".to_string(),
                guest_number: 4,
                comment: "Window seat please".to_string(),
                reservation_date: NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
                reservation_slot: "19:00".to_string(),
            },
        )
    }

    fn create_test_user() -> User {
        User {
            id: 9,
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "$2b$04$abcdefghijklmnopqrstuv".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            date_joined: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    mod booking_repository_tests {
        use super::*;

        fn repo() -> DynamoDbBookingRepository {
            DynamoDbBookingRepository::new(
                test_client(),
                ids(),
                "test-bookings".to_string(),
                "us-east-1".to_string(),
            )
        }

        #[test]
        fn test_booking_to_item_conversion() {
            let item = repo().booking_to_item(&create_test_booking());

            assert_eq!(
                item.get("slot_key"),
                Some(&AttributeValue::S("2024-12-25#19:00".to_string()))
            );
            assert_eq!(item.get("id"), Some(&AttributeValue::N("42".to_string())));
            assert_eq!(
                item.get("reservation_date"),
                Some(&AttributeValue::S("2024-12-25".to_string()))
            );
            assert_eq!(
                item.get("guest_number"),
                Some(&AttributeValue::N("4".to_string()))
            );
        }

        #[test]
        fn test_item_to_booking_conversion_roundtrip() {
            let repo = repo();
            let booking = create_test_booking();

            let converted = repo.item_to_booking(&repo.booking_to_item(&booking)).unwrap();
            assert_eq!(converted, booking);
        }

        #[test]
        fn test_item_to_booking_rejects_bad_data() {
            let repo = repo();

            let mut item = repo.booking_to_item(&create_test_booking());
            item.insert(
                "reservation_date".to_string(),
                AttributeValue::S("25/12/2024".to_string()),
            );
            assert!(matches!(
                repo.item_to_booking(&item),
                Err(RepositoryError::InvalidData { .. })
            ));

            let mut item = repo.booking_to_item(&create_test_booking());
            item.remove("first_name");
            assert!(repo.item_to_booking(&item).is_err());
        }

        #[test]
        fn test_repository_names() {
            let repo = repo();
            assert_eq!(repo.table_name(), "test-bookings");
            assert_eq!(repo.date_index(), "ReservationDateIndex");
        }
    }

    mod menu_repository_tests {
        use super::*;

        fn repo() -> DynamoDbMenuRepository {
            DynamoDbMenuRepository::new(
                test_client(),
                ids(),
                "test-menu".to_string(),
                "us-east-1".to_string(),
            )
        }

        #[test]
        fn test_menu_item_conversion_roundtrip() {
            let repo = repo();
            let menu_item = MenuItem {
                id: 3,
                name: "Lemon Dessert".to_string(),
                price: dec!(6.99),
                menu_item_description: "Grandma's recipe".to_string(),
            };

            let item = repo.menu_item_to_item(&menu_item);
            assert_eq!(item.get("price"), Some(&AttributeValue::N("6.99".to_string())));

            assert_eq!(repo.item_to_menu_item(&item).unwrap(), menu_item);
        }

        #[test]
        fn test_menu_item_without_description() {
            let repo = repo();
            let mut item = repo.menu_item_to_item(&MenuItem {
                id: 1,
                name: "Bruschetta".to_string(),
                price: dec!(8.50),
                menu_item_description: "Toasted bread".to_string(),
            });
            item.remove("menu_item_description");

            let converted = repo.item_to_menu_item(&item).unwrap();
            assert!(converted.menu_item_description.is_empty());

            item.insert("price".to_string(), AttributeValue::S("cheap".to_string()));
            assert!(repo.item_to_menu_item(&item).is_err());
        }
    }

    mod user_repository_tests {
        use super::*;

        fn repo() -> DynamoDbUserRepository {
            DynamoDbUserRepository::new(
                test_client(),
                ids(),
                "test-users".to_string(),
                "us-east-1".to_string(),
            )
        }

        #[test]
        fn test_user_conversion_roundtrip() {
            let repo = repo();
            let user = create_test_user();

            let item = repo.user_to_item(&user);
            assert_eq!(
                item.get("username"),
                Some(&AttributeValue::S("testuser".to_string()))
            );

            assert_eq!(repo.item_to_user(&item).unwrap(), user);
        }

        #[test]
        fn test_user_missing_password_hash() {
            let repo = repo();
            let mut item = repo.user_to_item(&create_test_user());
            item.remove("password_hash");

            assert!(matches!(
                repo.item_to_user(&item),
                Err(RepositoryError::InvalidData { .. })
            ));
        }
    }

    mod error_mapping_tests {
        use super::*;
        use aws_sdk_dynamodb::types::error::{
            ConditionalCheckFailedException, ResourceNotFoundException,
        };
        use aws_sdk_dynamodb::Error as DynamoDbError;

        #[test]
        fn test_conditional_check_maps_to_conflict() {
            let error = DynamoDbError::ConditionalCheckFailedException(
                ConditionalCheckFailedException::builder().build(),
            );
            assert!(matches!(
                map_dynamodb_error(error, "test-bookings"),
                RepositoryError::Conflict { .. }
            ));
        }

        #[test]
        fn test_missing_table_maps_to_table_not_found() {
            let error = DynamoDbError::ResourceNotFoundException(
                ResourceNotFoundException::builder().build(),
            );
            match map_dynamodb_error(error, "test-bookings") {
                RepositoryError::TableNotFound { table_name } => {
                    assert_eq!(table_name, "test-bookings")
                }
                other => panic!("Expected TableNotFound, got {:?}", other),
            }
        }
    }
}
