//! Parser for .bvh (Biovision Hierarchy) motion capture files.
//!
//! The whole file is split into whitespace tokens, the HIERARCHY section is
//! decoded into a forest of joints ([`Skeleton`]), and the MOTION section is
//! sliced back onto those joints by replaying the declaration order, giving
//! each joint with channels one [`Frame`] per declared frame.
//!
//! ```ignore
//! use bvh_forest::load_bvh_from_file;
//!
//! let bvh = load_bvh_from_file("walk.bvh")?;
//! for joint in bvh.skeleton.joints() {
//!     println!("{} has {} frames", joint.name(), joint.animation().len());
//! }
//! ```

pub mod error;
pub mod parse;
pub mod tokens;
pub mod types;
pub mod utils;

pub use error::{ParseError, ParseResult};
pub use parse::{load_bvh_from_file, load_bvh_from_string, parse_bvh_with, ParseOptions};
pub use types::{Axis, Bvh, Channel, Frame, Joint, JointRef, Position, Skeleton};
