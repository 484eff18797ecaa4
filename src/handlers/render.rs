use std::fmt::Write;

use crate::models::{FieldErrors, MenuItem, Profile, UserIdentity};

/// A one-off message shown at the top of the next rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// Per-request data every page layout needs
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<UserIdentity>,
    pub notice: Option<Notice>,
}

impl PageContext {
    pub fn new(user: Option<UserIdentity>) -> Self {
        Self { user, notice: None }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }
}

/// Every page the site can render, with the data it shows
#[derive(Debug, Clone)]
pub enum Page {
    Home,
    About,
    Menu {
        items: Vec<MenuItem>,
    },
    MenuItem {
        item: MenuItem,
    },
    Book,
    Register {
        username: String,
        email: String,
        errors: FieldErrors,
    },
    Login {
        username: String,
    },
    Profile {
        profile: Profile,
    },
    NotFound,
    ServerError,
}

impl Page {
    pub fn title(&self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::About => "About",
            Page::Menu { .. } => "Menu",
            Page::MenuItem { .. } => "Menu Item",
            Page::Book => "Reserve a Table",
            Page::Register { .. } => "Register",
            Page::Login { .. } => "Login",
            Page::Profile { .. } => "Profile",
            Page::NotFound => "Page Not Found",
            Page::ServerError => "Server Error",
        }
    }
}

/// Turns a page into a complete HTML document
pub trait PageRenderer: Send + Sync {
    fn render(&self, page: &Page, context: &PageContext) -> String;
}

/// Escape text for use inside HTML element content and quoted attributes
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Plain server-side HTML with no template engine
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    site_name: String,
}

impl HtmlRenderer {
    pub fn new(site_name: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
        }
    }

    fn nav(&self, out: &mut String, user: Option<&UserIdentity>) {
        out.push_str("<nav><ul>");
        for (href, label) in [
            ("/", "Home"),
            ("/about", "About"),
            ("/menu", "Menu"),
            ("/book", "Book"),
        ] {
            let _ = write!(out, "<li><a href=\"{}\">{}</a></li>", href, label);
        }
        match user {
            Some(user) => {
                let _ = write!(
                    out,
                    "<li><a href=\"/profile\">{}</a></li><li><a href=\"/logout\">Logout</a></li>",
                    escape_html(&user.username)
                );
            }
            None => out.push_str(
                "<li><a href=\"/login\">Login</a></li><li><a href=\"/register\">Register</a></li>",
            ),
        }
        out.push_str("</ul></nav>");
    }

    fn notice(out: &mut String, notice: &Notice) {
        let (class, message) = match notice {
            Notice::Info(message) => ("info", message),
            Notice::Error(message) => ("error", message),
        };
        let _ = write!(
            out,
            "<div class=\"notice {}\" role=\"status\">{}</div>",
            class,
            escape_html(message)
        );
    }

    fn field_errors(out: &mut String, errors: &FieldErrors, field: &str) {
        if let Some(messages) = errors.get(field) {
            let _ = write!(out, "<ul class=\"errorlist\" data-field=\"{}\">", field);
            for message in messages {
                let _ = write!(out, "<li>{}</li>", escape_html(message));
            }
            out.push_str("</ul>");
        }
    }

    fn input(out: &mut String, label: &str, name: &str, kind: &str, value: &str) {
        let _ = write!(
            out,
            "<p><label for=\"id_{name}\">{label}</label>\
             <input type=\"{kind}\" name=\"{name}\" id=\"id_{name}\" value=\"{value}\"></p>",
            name = name,
            label = label,
            kind = kind,
            value = escape_html(value),
        );
    }

    fn body(&self, out: &mut String, page: &Page) {
        match page {
            Page::Home => {
                let _ = write!(
                    out,
                    "<h1>{}</h1><p>Chicago's family-owned Mediterranean restaurant.</p>\
                     <p><a href=\"/book\">Reserve a table</a></p>",
                    escape_html(&self.site_name)
                );
            }
            Page::About => out.push_str(
                "<h1>About</h1><p>Little Lemon serves traditional recipes with a modern twist, \
                 run by two brothers who brought their family recipes to Chicago.</p>",
            ),
            Page::Menu { items } => {
                out.push_str("<h1>Menu</h1>");
                if items.is_empty() {
                    out.push_str("<p>The menu is being prepared.</p>");
                } else {
                    out.push_str("<ul class=\"menu\">");
                    for item in items {
                        let _ = write!(
                            out,
                            "<li><a href=\"/menu/{}\">{}</a> <span class=\"price\">${}</span></li>",
                            item.id,
                            escape_html(&item.name),
                            item.price
                        );
                    }
                    out.push_str("</ul>");
                }
            }
            Page::MenuItem { item } => {
                let _ = write!(
                    out,
                    "<h1>{}</h1><p class=\"price\">${}</p><p>{}</p>\
                     <p><a href=\"/menu\">Back to menu</a></p>",
                    escape_html(&item.name),
                    item.price,
                    escape_html(&item.menu_item_description)
                );
            }
            Page::Book => {
                out.push_str("<h1>Reserve a Table</h1><form id=\"booking-form\" method=\"post\" action=\"/book\">");
                Self::input(out, "First name", "first_name", "text", "");
                Self::input(out, "Last name", "last_name", "text", "");
                Self::input(out, "Number of guests", "guest_number", "number", "1");
                Self::input(out, "Comment", "comment", "text", "");
                Self::input(out, "Date", "reservation_date", "date", "");
                Self::input(out, "Time", "reservation_slot", "time", "");
                out.push_str(
                    "<button type=\"submit\">Reserve</button></form>\
                     <div id=\"bookings\" data-source=\"/reservations_api\"></div>",
                );
            }
            Page::Register {
                username,
                email,
                errors,
            } => {
                out.push_str("<h1>Register</h1><form method=\"post\" action=\"/register\">");
                Self::input(out, "Username", "username", "text", username);
                Self::field_errors(out, errors, "username");
                Self::input(out, "Email", "email", "email", email);
                Self::field_errors(out, errors, "email");
                Self::input(out, "Password", "password1", "password", "");
                Self::field_errors(out, errors, "password1");
                Self::input(out, "Password confirmation", "password2", "password", "");
                Self::field_errors(out, errors, "password2");
                out.push_str("<button type=\"submit\">Register</button></form>");
            }
            Page::Login { username } => {
                out.push_str("<h1>Login</h1><form method=\"post\" action=\"/login\">");
                Self::input(out, "Username", "username", "text", username);
                Self::input(out, "Password", "password", "password", "");
                out.push_str("<button type=\"submit\">Login</button></form>");
            }
            Page::Profile { profile } => {
                let _ = write!(
                    out,
                    "<h1>{}</h1><p>{}</p><h2>Your bookings</h2>",
                    escape_html(&profile.username),
                    escape_html(&profile.email)
                );
                if profile.bookings.is_empty() {
                    out.push_str("<p>No bookings yet.</p>");
                } else {
                    out.push_str("<table class=\"bookings\"><tr><th>Date</th><th>Time</th><th>Guests</th><th>Comment</th></tr>");
                    for booking in &profile.bookings {
                        let _ = write!(
                            out,
                            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                            booking.reservation_date,
                            escape_html(&booking.reservation_slot),
                            booking.guest_number,
                            escape_html(&booking.comment)
                        );
                    }
                    out.push_str("</table>");
                }
            }
            Page::NotFound => out.push_str(
                "<h1>Page Not Found</h1><p>The page you requested does not exist.</p>",
            ),
            Page::ServerError => out.push_str(
                "<h1>Server Error</h1><p>Something went wrong. Please try again later.</p>",
            ),
        }
    }
}

impl PageRenderer for HtmlRenderer {
    fn render(&self, page: &Page, context: &PageContext) -> String {
        let mut out = String::with_capacity(2048);
        let _ = write!(
            out,
            "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
             <title>{} | {}</title></head><body>",
            page.title(),
            escape_html(&self.site_name)
        );
        self.nav(&mut out, context.user.as_ref());
        out.push_str("<main>");
        if let Some(notice) = &context.notice {
            Self::notice(&mut out, notice);
        }
        self.body(&mut out, page);
        out.push_str("</main></body></html>");
        out
    }
}
