// packages/engine/src/main.rs
//! Sentra Lab Swizzle Engine
//!
//! Self-check binary: declares a small type hierarchy, swizzles an inherited
//! operation on one subclass and prints what each receiver runs.

use anyhow::Result;
use sentra_lab_swizzle::observability::init_tracing;
use sentra_lab_swizzle::utils::config::EngineConfig;
use sentra_lab_swizzle::{Implementation, Interposer, OperationLocator, TypeRegistry};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

fn main() -> Result<()> {
    // Load configuration
    let config = EngineConfig::load()?;
    init_tracing(&config.logging)?;

    info!("Starting Sentra Lab Swizzle Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {:?}", config);

    let registry = Arc::new(TypeRegistry::new());
    let base = registry.declare_type("Controller", None)?;
    let screen = registry.declare_type("ScreenController", Some(base))?;
    let other = registry.declare_type("SettingsController", Some(base))?;

    registry.register_operation(base, "appear", Implementation::new("v@:", |inv| {
        json!({ "ran": "Controller.appear", "receiver": inv.receiver.to_string() })
    }))?;
    registry.register_operation(base, "traced_appear", Implementation::new("v@:", |inv| {
        // Once exchanged, this selector reaches the original body
        let inner = inv.send("traced_appear", inv.args).unwrap_or_else(|e| json!(e.to_string()));
        json!({ "ran": "Controller.traced_appear", "inner": inner })
    }))?;

    let interposer = Interposer::install(Arc::clone(&registry), config)?;
    // Both operations are inherited; only ScreenController's own table changes
    let result = interposer.swizzle_instance_for(
        screen,
        "appear",
        OperationLocator::new(screen, "traced_appear"),
    );

    if let Err(e) = result.into_result() {
        error!("Swizzle failed: {}", e);
        return Err(e.into());
    }

    for (name, desc) in [("ScreenController", screen), ("SettingsController", other), ("Controller", base)] {
        let value = registry.invoke(desc, "appear", &[])?;
        println!("{} -> {}", name, serde_json::to_string(&value)?);
    }

    info!("Interposer stats: {:?}", interposer.stats());
    Ok(())
}
