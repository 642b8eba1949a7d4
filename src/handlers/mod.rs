//! Content modules.
//!
//! Each module registers its own routes on the shared [`Router`](crate::Router)
//! through [`Module`](crate::Module) and knows nothing about the others or
//! about the middleware in front of it.
//!
//! | Module | Routes |
//! |---|---|
//! | [`Text`] | `GET /text`, `GET /text/{words}` |
//! | [`Image`] | `GET /img/{width}/{height}` |
//! | [`Json`] | `GET /json`, `GET /json/users/{id}`, `POST /json/echo` |

mod image;
mod json;
mod text;

pub use image::Image;
pub use json::Json;
pub use text::Text;
