//! Reads NXDL base class definitions into [GroupSchema]s.
//!
//! Only the declarations an accessor needs are kept: fields, their attributes,
//! shapes and enumerations, subgroups, group attributes and symbols.
//! Documentation and elements this reader does not know are skipped, which
//! keeps it tolerant of newer definitions.
use super::{
    AttributeDescriptor, ChildDescriptor, Dim, Dimensions, Enumeration, FieldDescriptor,
    GroupSchema, NexusType, NexusUnitCategory, Occurrence,
};
use quick_xml::{
    Reader,
    events::{BytesStart, Event, attributes::AttrError},
};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum NxdlError {
    #[error("XML Error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML Attribute Error: {0}")]
    Attribute(#[from] AttrError),
    #[error("Missing Attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },
    #[error("Invalid Value '{value}' for '{attribute}' on <{element}>")]
    InvalidValue {
        element: String,
        attribute: String,
        value: String,
    },
    #[error("No <definition> Element Found")]
    MissingDefinition,
    #[error("Unexpected End of Document inside <{0}>")]
    UnexpectedEof(String),
}

/// Parses one NXDL document.
pub fn parse_nxdl(xml: &str) -> Result<GroupSchema, NxdlError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"definition" => {
                return parse_definition(&mut reader, e, true);
            }
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"definition" => {
                return parse_definition(&mut reader, e, false);
            }
            Ok(Event::Start(ref e)) => skip_element(&mut reader, e)?,
            Ok(Event::Eof) => return Err(NxdlError::MissingDefinition),
            Err(err) => return Err(err.into()),
            _ => {}
        }
        buf.clear();
    }
}

fn parse_definition(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    has_body: bool,
) -> Result<GroupSchema, NxdlError> {
    let mut schema = GroupSchema::new(&attribute_value_required(start, b"name")?);
    schema.extends = attribute_value(start, b"extends")?;
    schema.deprecated = attribute_value(start, b"deprecated")?;

    if has_body {
        for_each_child(reader, start, |reader, element, has_body| {
            match element.local_name().as_ref() {
                b"symbols" => schema.symbols.extend(parse_symbols(reader, element, has_body)?),
                b"field" => schema.fields.push(parse_field(reader, element, has_body)?),
                b"group" => {
                    schema.children.push(parse_group(element)?);
                    skip(reader, element, has_body)?;
                }
                b"attribute" => {
                    schema
                        .attributes
                        .push(parse_attribute(reader, element, has_body)?)
                }
                _ => skip(reader, element, has_body)?,
            }
            Ok(())
        })?;
    }
    Ok(schema)
}

fn parse_symbols(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    has_body: bool,
) -> Result<Vec<String>, NxdlError> {
    let mut symbols = Vec::new();
    if has_body {
        for_each_child(reader, start, |reader, element, has_body| {
            if element.local_name().as_ref() == b"symbol" {
                symbols.push(attribute_value_required(element, b"name")?);
            }
            skip(reader, element, has_body)
        })?;
    }
    Ok(symbols)
}

fn parse_field(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    has_body: bool,
) -> Result<FieldDescriptor, NxdlError> {
    let name = attribute_value_required(start, b"name")?;
    let mut field = FieldDescriptor::new(&name, parse_type(start)?);
    if attribute_value(start, b"nameType")?.as_deref() == Some("any") {
        field.flexible_name = true;
    }
    field.units = parse_units(start)?;
    field.occurrence = parse_occurrence(start)?;
    field.deprecated = attribute_value(start, b"deprecated")?;

    if has_body {
        for_each_child(reader, start, |reader, element, has_body| {
            match element.local_name().as_ref() {
                b"dimensions" => {
                    field.dimensions = Some(parse_dimensions(reader, element, has_body)?)
                }
                b"enumeration" => {
                    field.enumeration = Some(parse_enumeration(reader, element, has_body)?)
                }
                b"attribute" => field
                    .attributes
                    .push(parse_attribute(reader, element, has_body)?),
                _ => skip(reader, element, has_body)?,
            }
            Ok(())
        })?;
    }
    Ok(field)
}

fn parse_group(start: &BytesStart<'_>) -> Result<ChildDescriptor, NxdlError> {
    let mut child = ChildDescriptor::new(&attribute_value_required(start, b"type")?);
    child.name = attribute_value(start, b"name")?;
    child.occurrence = parse_occurrence(start)?;
    child.deprecated = attribute_value(start, b"deprecated")?;
    child.max_occurs = match attribute_value(start, b"maxOccurs")? {
        None => None,
        Some(value) if value == "unbounded" => None,
        Some(value) => Some(
            value
                .parse()
                .map_err(|_| invalid_value(start, b"maxOccurs", &value))?,
        ),
    };
    Ok(child)
}

fn parse_attribute(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    has_body: bool,
) -> Result<AttributeDescriptor, NxdlError> {
    let name = attribute_value_required(start, b"name")?;
    let mut attribute = AttributeDescriptor::new(&name, parse_type(start)?);
    attribute.occurrence = parse_occurrence(start)?;
    attribute.deprecated = attribute_value(start, b"deprecated")?;

    if has_body {
        for_each_child(reader, start, |reader, element, has_body| {
            if element.local_name().as_ref() == b"enumeration" {
                attribute.enumeration = Some(parse_enumeration(reader, element, has_body)?);
                Ok(())
            } else {
                skip(reader, element, has_body)
            }
        })?;
    }
    Ok(attribute)
}

fn parse_enumeration(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    has_body: bool,
) -> Result<Enumeration, NxdlError> {
    let mut enumeration = Enumeration {
        items: Vec::new(),
        open: flag(start, b"open")?,
    };
    if has_body {
        for_each_child(reader, start, |reader, element, has_body| {
            if element.local_name().as_ref() == b"item" {
                enumeration
                    .items
                    .push(attribute_value_required(element, b"value")?);
            }
            skip(reader, element, has_body)
        })?;
    }
    Ok(enumeration)
}

fn parse_dimensions(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    has_body: bool,
) -> Result<Dimensions, NxdlError> {
    // Symbolic ranks such as `rank="dataRank"` leave the rank unconstrained.
    let rank = attribute_value(start, b"rank")?.and_then(|rank| rank.parse().ok());
    let mut indexed = Vec::new();
    if has_body {
        for_each_child(reader, start, |reader, element, has_body| {
            if element.local_name().as_ref() == b"dim" {
                let index = match attribute_value(element, b"index")? {
                    Some(index) => index
                        .parse::<usize>()
                        .map_err(|_| invalid_value(element, b"index", &index))?,
                    None => indexed.len() + 1,
                };
                let dim = match attribute_value(element, b"value")? {
                    Some(value) => value
                        .parse()
                        .map(Dim::Fixed)
                        .unwrap_or(Dim::Symbol(value)),
                    None => Dim::Symbol(
                        attribute_value(element, b"ref")?.unwrap_or_else(|| index.to_string()),
                    ),
                };
                indexed.push((index, dim));
            }
            skip(reader, element, has_body)
        })?;
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(Dimensions {
        rank,
        dims: indexed.into_iter().map(|(_, dim)| dim).collect(),
    })
}

/// NXDL types default to `NX_CHAR` when omitted.
fn parse_type(element: &BytesStart<'_>) -> Result<NexusType, NxdlError> {
    match attribute_value(element, b"type")? {
        Some(value) => {
            NexusType::from_str(&value).map_err(|_| invalid_value(element, b"type", &value))
        }
        None => Ok(NexusType::default()),
    }
}

fn parse_units(element: &BytesStart<'_>) -> Result<Option<NexusUnitCategory>, NxdlError> {
    Ok(attribute_value(element, b"units")?.and_then(|value| {
        NexusUnitCategory::from_str(&value)
            .inspect_err(|_| {
                warn!(
                    "Ignoring unknown unit category {value} on <{}>",
                    element_name(element)
                )
            })
            .ok()
    }))
}

fn parse_occurrence(element: &BytesStart<'_>) -> Result<Occurrence, NxdlError> {
    if flag(element, b"required")? {
        return Ok(Occurrence::Required);
    }
    if flag(element, b"recommended")? {
        return Ok(Occurrence::Recommended);
    }
    match attribute_value(element, b"optional")?.as_deref() {
        Some("true") => return Ok(Occurrence::Optional),
        Some("false") => return Ok(Occurrence::Required),
        _ => {}
    }
    match attribute_value(element, b"minOccurs")? {
        Some(value) => match value.parse::<usize>() {
            Ok(0) => Ok(Occurrence::Optional),
            Ok(_) => Ok(Occurrence::Required),
            Err(_) => Err(invalid_value(element, b"minOccurs", &value)),
        },
        None => Ok(Occurrence::Optional),
    }
}

/// Calls `visit` on each direct child element of `start`, until its end tag.
/// `visit` is told whether the child has a body and must consume it if so.
fn for_each_child<'x, F>(
    reader: &mut Reader<&'x [u8]>,
    start: &BytesStart<'_>,
    mut visit: F,
) -> Result<(), NxdlError>
where
    F: FnMut(&mut Reader<&'x [u8]>, &BytesStart<'_>, bool) -> Result<(), NxdlError>,
{
    let end = start.name().as_ref().to_vec();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => visit(reader, e, true)?,
            Ok(Event::Empty(ref e)) => visit(reader, e, false)?,
            Ok(Event::End(ref e)) if e.name().as_ref() == end.as_slice() => return Ok(()),
            Ok(Event::Eof) => return Err(NxdlError::UnexpectedEof(element_name(start))),
            Err(err) => return Err(err.into()),
            _ => {}
        }
        buf.clear();
    }
}

fn skip(
    reader: &mut Reader<&[u8]>,
    element: &BytesStart<'_>,
    has_body: bool,
) -> Result<(), NxdlError> {
    if has_body {
        skip_element(reader, element)?;
    }
    Ok(())
}

fn skip_element(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<(), NxdlError> {
    let end = start.name().as_ref().to_vec();
    reader.read_to_end(quick_xml::name::QName(&end))?;
    Ok(())
}

fn attribute_value(event: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, NxdlError> {
    for attr in event.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            let value = attr.unescape_value()?;
            let trimmed = value.trim();
            return Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()));
        }
    }
    Ok(None)
}

fn attribute_value_required(event: &BytesStart<'_>, name: &[u8]) -> Result<String, NxdlError> {
    attribute_value(event, name)?.ok_or_else(|| NxdlError::MissingAttribute {
        element: element_name(event),
        attribute: String::from_utf8_lossy(name).into_owned(),
    })
}

fn flag(event: &BytesStart<'_>, name: &[u8]) -> Result<bool, NxdlError> {
    Ok(matches!(
        attribute_value(event, name)?.as_deref(),
        Some("true" | "1")
    ))
}

fn invalid_value(event: &BytesStart<'_>, attribute: &[u8], value: &str) -> NxdlError {
    NxdlError::InvalidValue {
        element: element_name(event),
        attribute: String::from_utf8_lossy(attribute).into_owned(),
        value: value.to_owned(),
    }
}

fn element_name(event: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(event.local_name().as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NXDL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<?xml-stylesheet type="text/xsl" href="nxdlformat.xsl" ?>
<definition xmlns="http://definition.nexusformat.org/nxdl/3.1" category="base"
    name="NXwidget" type="group" extends="NXobject">
    <symbols>
        <doc>Symbols used below</doc>
        <symbol name="n"><doc>number of points</doc></symbol>
    </symbols>
    <doc>A test widget, with <b>markup</b> in its docs.</doc>
    <field name="mode" required="true">
        <doc>Operating mode</doc>
        <enumeration>
            <item value="fast"><doc>quick</doc></item>
            <item value="slow"/>
        </enumeration>
    </field>
    <field name="temperature" type="NX_FLOAT" units="NX_TEMPERATURE"/>
    <field name="positions" type="NX_NUMBER" units="NX_LENGTH" recommended="true">
        <dimensions rank="2">
            <dim index="2" value="3"/>
            <dim index="1" value="n"/>
        </dimensions>
        <attribute name="frame">
            <enumeration open="true"><item value="lab"/></enumeration>
        </attribute>
    </field>
    <field name="DATA" type="NX_NUMBER" deprecated="use values"/>
    <field name="anything" nameType="any" type="NX_INT" minOccurs="1"/>
    <group type="NXlog" name="temperature_log" maxOccurs="1"/>
    <group type="NXgeometry" deprecated="use NXoff_geometry">
        <doc>legacy</doc>
        <field name="ignored"/>
    </group>
    <attribute name="default"/>
</definition>
"#;

    #[test]
    fn parses_definition() {
        let schema = parse_nxdl(NXDL).unwrap();
        assert_eq!(schema.class, "NXwidget");
        assert_eq!(schema.extends.as_deref(), Some("NXobject"));
        assert_eq!(schema.symbols, vec!["n".to_owned()]);
        assert_eq!(schema.fields.len(), 5);
        assert_eq!(schema.children.len(), 2);
        assert_eq!(schema.attributes.len(), 1);
    }

    #[test]
    fn parses_field_details() {
        let schema = parse_nxdl(NXDL).unwrap();

        let mode = schema.field("mode").unwrap();
        assert_eq!(mode.nexus_type, NexusType::Char);
        assert_eq!(mode.occurrence, Occurrence::Required);
        assert_eq!(
            mode.enumeration,
            Some(Enumeration::closed(["fast", "slow"]))
        );

        let temperature = schema.field("temperature").unwrap();
        assert_eq!(temperature.units, Some(NexusUnitCategory::Temperature));
        assert_eq!(temperature.occurrence, Occurrence::Optional);

        let positions = schema.field("positions").unwrap();
        assert_eq!(positions.occurrence, Occurrence::Recommended);
        assert_eq!(
            positions.dimensions,
            Some(Dimensions {
                rank: Some(2),
                dims: vec![Dim::Symbol("n".to_owned()), Dim::Fixed(3)],
            })
        );
        assert!(positions.attribute("frame").unwrap().enumeration.as_ref().unwrap().open);
    }

    #[test]
    fn flexible_names() {
        let schema = parse_nxdl(NXDL).unwrap();
        assert!(schema.exact_field("DATA").unwrap().flexible_name);
        assert!(schema.exact_field("anything").unwrap().flexible_name);
        assert_eq!(
            schema.exact_field("DATA").unwrap().deprecated.as_deref(),
            Some("use values")
        );
    }

    #[test]
    fn parses_groups() {
        let schema = parse_nxdl(NXDL).unwrap();
        let log = schema.child("NXlog").unwrap();
        assert_eq!(log.name.as_deref(), Some("temperature_log"));
        assert_eq!(log.max_occurs, Some(1));
        let geometry = schema.child("NXgeometry").unwrap();
        assert_eq!(geometry.max_occurs, None);
        assert_eq!(geometry.deprecated.as_deref(), Some("use NXoff_geometry"));
        assert!(schema.field("ignored").is_none());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = parse_nxdl(
            r#"<definition name="NXbad"><field name="q" type="NX_QUATERNION"/></definition>"#,
        );
        assert!(matches!(
            result,
            Err(NxdlError::InvalidValue { ref attribute, .. }) if attribute == "type"
        ));
    }

    #[test]
    fn missing_name_is_rejected() {
        let result = parse_nxdl(r#"<definition name="NXbad"><field type="NX_INT"/></definition>"#);
        assert!(matches!(
            result,
            Err(NxdlError::MissingAttribute { ref element, ref attribute })
                if element == "field" && attribute == "name"
        ));
    }

    #[test]
    fn malformed_xml_is_rejected() {
        let result = parse_nxdl(r#"<definition name="NXbad"><field name="a"></definition>"#);
        assert!(result.is_err());
    }

    #[test]
    fn document_without_definition() {
        assert!(matches!(
            parse_nxdl("<other/>"),
            Err(NxdlError::MissingDefinition)
        ));
    }
}
