//! Provision an NVIDIA Jetson device with a derived ML container image and
//! launch the web app it serves.
//!
//! Two flows, each a linear chain of external commands:
//! - [`provision::run_provision`]: clone and install the container toolkit,
//!   start and verify a temporary container, build the derived image.
//! - [`launch::run_launch`]: start the app image in the background, wait for
//!   it to serve, open a browser at it.

pub mod build_description;
pub mod cleanup;
pub mod config;
pub mod engine;
pub mod error;
pub mod launch;
pub mod process;
pub mod provision;
pub mod resolver;
pub mod step;

pub use error::FlowError;
pub use step::Step;
