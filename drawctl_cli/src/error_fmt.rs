//! Human-readable error descriptions and structured JSON error formatting.

use drawctl_core::error::{BuildError, DrawError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingValve => {
                "What happened: No valve was provided to the draw executor.\nLikely causes: The valve output failed to initialize or was not wired into the builder.\nHow to fix: Ensure the valve is created successfully and passed via with_valve(...).".to_string()
            }
            BuildError::MissingFlowSensor => {
                "What happened: No flow meter was provided to the draw executor.\nLikely causes: The flow input failed to initialize or was not wired into the builder.\nHow to fix: Ensure the flow meter is created successfully and passed via with_flow_sensor(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DrawError>() {
        let chain = format!("{err:#}");
        return match de {
            DrawError::HardwareFault(_) => format!(
                "What happened: GPIO fault ({chain}).\nLikely causes: Wrong pin numbers, pins already in use, or no permission to access GPIO.\nHow to fix: Check [pins] valve_out/flow_in in the config and make sure the process may use /dev/gpiomem."
            ),
            DrawError::Hardware(_) => format!(
                "What happened: The valve or flow meter stopped responding ({chain}).\nLikely causes: Wiring or driver failure. The valve state cannot be trusted.\nHow to fix: Check the valve and flow meter wiring, then run `self-check`."
            ),
            DrawError::Config(_) => format!(
                "What happened: Invalid configuration or input file ({chain}).\nLikely causes: Missing or out-of-range values in the TOML, or a malformed schedule/plan CSV.\nHow to fix: Fix the file named above and rerun. `check-schedule` validates a schedule without drawing."
            ),
            DrawError::Io(_) => format!(
                "What happened: File I/O failed ({chain}).\nLikely causes: Missing directory or insufficient permissions.\nHow to fix: Check the path and its permissions."
            ),
            DrawError::State(_) => format!(
                "What happened: {chain}.\nLikely causes: The draw worker stopped after a panic in a hardware driver.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: hardware 3, config 4, I/O 5, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 4;
    }
    match err.downcast_ref::<DrawError>() {
        Some(DrawError::Hardware(_) | DrawError::HardwareFault(_)) => 3,
        Some(DrawError::Config(_)) => 4,
        Some(DrawError::Io(_)) => 5,
        Some(DrawError::State(_)) | None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<DrawError>() {
        Some(DrawError::Hardware(_)) => "Hardware",
        Some(DrawError::HardwareFault(_)) => "HardwareFault",
        Some(DrawError::Config(_)) => "Config",
        Some(DrawError::Io(_)) => "Io",
        Some(DrawError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "error": format!("{err:#}"),
        "message": humanize(err),
    })
    .to_string()
}
