use crate::DescribeOpts;
use nexus_accessor::{GroupSchema, SchemaRegistry, schema::Occurrence};

pub(crate) fn list_classes(registry: &SchemaRegistry) -> anyhow::Result<()> {
    for class in registry.classes() {
        println!("{class}");
    }
    Ok(())
}

pub(crate) fn run(registry: &SchemaRegistry, args: DescribeOpts) -> anyhow::Result<()> {
    let schema = registry.get(&args.class)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(schema.as_ref())?);
    } else {
        print!("{}", describe(&schema));
    }
    Ok(())
}

/// Renders a schema as an indented summary, one declaration per line.
fn describe(schema: &GroupSchema) -> String {
    let mut lines = vec![match &schema.extends {
        Some(parent) => format!("{} extends {parent}", schema.class),
        None => schema.class.clone(),
    }];
    if let Some(message) = &schema.deprecated {
        lines.push(format!("  deprecated: {message}"));
    }
    for attribute in &schema.attributes {
        lines.push(format!("  @{}: {}", attribute.name, attribute.nexus_type));
    }
    for field in &schema.fields {
        let mut line = format!(
            "  {}: {}{}",
            field.name,
            field.nexus_type,
            occurrence(field.occurrence)
        );
        if let Some(units) = field.units {
            line.push_str(&format!(" [{units}]"));
        }
        if let Some(enumeration) = &field.enumeration {
            line.push_str(&format!(" one of [{}]", enumeration.items.join(", ")));
        }
        if field.deprecated.is_some() {
            line.push_str(" (deprecated)");
        }
        lines.push(line);
        for attribute in &field.attributes {
            lines.push(format!("    @{}: {}", attribute.name, attribute.nexus_type));
        }
    }
    for child in &schema.children {
        let mut line = format!(
            "  {}: {}{}",
            child.default_name(),
            child.class,
            occurrence(child.occurrence)
        );
        if child.deprecated.is_some() {
            line.push_str(" (deprecated)");
        }
        lines.push(line);
    }
    lines.iter().map(|line| format!("{line}\n")).collect()
}

fn occurrence(occurrence: Occurrence) -> String {
    match occurrence {
        Occurrence::Optional => String::new(),
        other => format!(" ({other})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_accessor::NexusClass;

    #[test]
    fn describes_moderator() {
        let registry = SchemaRegistry::with_builtin_classes().unwrap();
        let text = describe(&registry.get(NexusClass::Moderator.as_ref()).unwrap());
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("NXmoderator extends NXcomponent"));
        assert!(text.contains("  temperature: NX_FLOAT [NX_TEMPERATURE]\n"));
        assert!(text.contains("  geometry: NXgeometry (deprecated)\n"));
        assert!(text.contains("  temperature_log: NXlog\n"));
    }
}
