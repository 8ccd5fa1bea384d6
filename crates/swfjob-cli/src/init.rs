//! `mass init` (§4.10, `original_source/mass/cli.py::init`).
//!
//! Against a real workflow service this would issue register-domain /
//! register-workflow-type / register-activity-type calls; there is no wire
//! client here, so it only reports what would be registered.

use anyhow::Result;

pub fn run(domain: &str) -> Result<()> {
    println!("domain:        {domain}");
    println!("workflow type: Job (1.0)");
    println!("activity type: Action (1.0)");
    println!("(no workflow-service client configured — nothing was actually registered)");
    Ok(())
}
