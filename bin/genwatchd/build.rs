//! ---
//! gw_section: "05-daemon"
//! gw_subsection: "binary"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Binary entrypoint for the GenWatch daemon."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Best-effort git metadata: source tarball builds still succeed and
    // report UNKNOWN through VersionInfo.
    EmitBuilder::builder().all_cargo().all_git().emit()?;
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
