//! # Selva Engine
//!
//! Headless runner for the Selva boss encounter.
//!
//! Plays the three-phase fight with a scripted player on a fixed timestep,
//! then writes the learned behavior profile back to disk.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod input;
mod timing;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("selva=info".parse()?))
        .init();

    info!("Selva starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    app::run()?;

    info!("Selva shutdown complete");
    Ok(())
}
