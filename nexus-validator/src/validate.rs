use crate::ValidateOpts;
use anyhow::bail;
use nexus_accessor::{DeprecationPolicy, SchemaRegistry, ViolationKind};
use std::sync::Arc;
use tracing::info;

pub(crate) fn run(registry: SchemaRegistry, args: ValidateOpts) -> anyhow::Result<()> {
    let registry = Arc::new(registry);
    let file = hdf5::File::open(&args.file)?;
    info!("Validating {}", args.file.display());

    let mut violations = registry.validate_below(&file.group("/")?)?;
    if args.deprecation == DeprecationPolicy::Allow {
        violations.retain(|violation| violation.kind != ViolationKind::Deprecated);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&violations)?);
    } else {
        for violation in &violations {
            println!("{violation}");
        }
    }
    info!("Found {} violations", violations.len());

    if args.deprecation == DeprecationPolicy::Deny
        && violations
            .iter()
            .any(|violation| violation.kind == ViolationKind::Deprecated)
    {
        bail!("Deprecated items in {}", args.file.display());
    }
    if args.fail_on_violation && !violations.is_empty() {
        bail!("{} violations in {}", violations.len(), args.file.display());
    }
    Ok(())
}
