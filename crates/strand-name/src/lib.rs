//! Strand Naming
//!
//! Every unit of content is addressed by a hierarchical [`Name`]. The structural
//! role of a name (torrent descriptor, file manifest or data packet) is carried
//! purely by the shape of its trailing components:
//!
//! ```text
//! /<prefix>/torrent-file/<digest>                   torrent descriptor
//! /<prefix>/torrent-file/seq=<n>/<digest>           torrent descriptor segment
//! /<prefix>/<file>/seq=<m>/<digest>                 file manifest
//! /<prefix>/<file>/seq=<m>/seq=<n>/<digest>         data packet
//! ```

mod classify;
mod component;
mod error;
mod name;

pub use classify::{classify, NameType, TORRENT_FILE_COMPONENT};
pub use component::Component;
pub use error::NameError;
pub use name::Name;

pub type Result<T> = std::result::Result<T, NameError>;
