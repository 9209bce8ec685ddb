//! Client library for the IBM Connections Blogs Atom API.
//!
//! The core is the response-parsing layer in [`response`]: namespaced
//! Atom XML documents become normalized [`Post`] records via a small
//! fixed set of compiled XPath-subset expressions ([`xml::select`]).
//! [`service::BlogsService`] is thin orchestration around it — URL
//! assembly, basic auth, response guarding — with one HTTP exchange per
//! operation and no internal retries.
//!
//! ```no_run
//! use connections_blogs::{BlogsConfig, BlogsService, PostQuery};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = BlogsConfig::default();
//! config.base_url = "https://apps.na.collabserv.com/blogs/".to_string();
//!
//! let service = BlogsService::new(config)?;
//! let feed = service.get_posts("homepage", &PostQuery::default()).await?;
//! for post in &feed.entries {
//!     println!("{}  {}", post.id, post.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod response;
pub mod service;
pub mod xml;

pub use config::{AuthType, BlogsConfig, ConfigError};
pub use response::{
    parse_feed, parse_post, LinkRelation, ParseError, Post, PostCollection, PostFeed, PostLink,
    UserInfo,
};
pub use service::{BlogsService, PostDraft, PostQuery, ServiceError};
