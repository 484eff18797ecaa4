// Services module - business logic layer

pub mod auth_service;
pub mod booking_service;
pub mod menu_service;
pub mod password;
pub mod reservation_service;
pub mod session;

pub use auth_service::{AuthService, AuthenticatedSession};
pub use booking_service::BookingService;
pub use menu_service::MenuService;
pub use password::{BcryptPasswordHasher, PasswordHasher, MAX_BCRYPT_COST, MIN_BCRYPT_COST};
pub use reservation_service::ReservationService;
pub use session::{InMemorySessionStore, Session, SessionStore, MAX_SESSION_TTL_SECONDS};
