//! JSON-LD and microdata vehicle compatibility
//!
//! Product pages that publish schema.org markup list compatible vehicles as
//! `Vehicle`/`Car` objects, usually under `isAccessoryOrSparePartFor`. Any
//! object carrying both a make and a model key is accepted as well, since
//! catalog platforms rarely agree on the type name.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use serde_json::{Map, Value};

use super::{Extraction, build_all, parse_year_range};
use crate::domain::ApplicationDraft;
use crate::infrastructure::parsing::html_text::{element_text, static_selector};
use crate::infrastructure::parsing::{ParseContext, ParsingError, ParsingResult};

static JSON_LD: Lazy<Selector> =
    Lazy::new(|| static_selector(r#"script[type="application/ld+json"]"#));
static ITEMTYPE: Lazy<Selector> = Lazy::new(|| static_selector("[itemtype]"));
static ITEMPROP: Lazy<Selector> = Lazy::new(|| static_selector("[itemprop]"));

const VEHICLE_TYPES: &[&str] = &["vehicle", "car", "motorizedbicycle", "busorcoach"];
const MAKE_KEYS: &[&str] = &["vehicleMake", "make", "manufacturer", "brand"];
const MODEL_KEYS: &[&str] = &["vehicleModel", "model"];
const YEAR_KEYS: &[&str] = &["vehicleModelDate", "modelDate", "modelYear", "year", "years"];
const TRIM_KEYS: &[&str] = &["vehicleConfiguration", "trim", "submodel"];
const ENGINE_KEYS: &[&str] = &["vehicleEngine", "engine"];

pub fn extract(ctx: &ParseContext<'_>) -> ParsingResult<Extraction> {
    let html = ctx.html();
    let mut drafts = Vec::new();
    let mut errors = Vec::new();

    let scripts: Vec<ElementRef<'_>> = html.select(&JSON_LD).collect();
    for script in &scripts {
        let body: String = script.text().collect();
        match serde_json::from_str::<Value>(body.trim()) {
            Ok(value) => collect_json_vehicles(&value, &mut drafts),
            Err(e) => {
                errors.push(ParsingError::malformed_structured_data("json-ld", e).to_string());
            }
        }
    }

    let microdata: Vec<ElementRef<'_>> = html
        .select(&ITEMTYPE)
        .filter(|el| {
            el.value()
                .attr("itemtype")
                .is_some_and(|t| t.to_lowercase().contains("vehicle"))
        })
        .collect();
    drafts.extend(microdata.iter().filter_map(|el| microdata_vehicle(*el)));

    Ok(Extraction::new(build_all(drafts, &ctx.bounds))
        .with_errors(errors)
        .with_metadata("json_ld_count", scripts.len())
        .with_metadata("microdata_count", microdata.len()))
}

fn is_vehicle_type(object: &Map<String, Value>) -> bool {
    let type_matches = |t: &str| {
        let t = t.rsplit('/').next().unwrap_or(t).to_lowercase();
        VEHICLE_TYPES.contains(&t.as_str())
    };
    match object.get("@type") {
        Some(Value::String(t)) => type_matches(t),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(type_matches),
        _ => false,
    }
}

fn collect_json_vehicles(value: &Value, drafts: &mut Vec<ApplicationDraft>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_json_vehicles(item, drafts)),
        Value::Object(object) => {
            let typed = is_vehicle_type(object);
            // Untyped objects only count with explicit vehicle keys, so a
            // Product's own brand/model pair is never mistaken for a vehicle.
            let keyed = object.contains_key("vehicleMake") || object.contains_key("make");
            if typed || keyed {
                if let Some(draft) = json_vehicle(object) {
                    drafts.push(draft);
                    return;
                }
            }
            object
                .values()
                .for_each(|child| collect_json_vehicles(child, drafts));
        }
        _ => {}
    }
}

/// Text of a scalar, or of the `name` of a nested object.
fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(object) => object.get("name").and_then(json_text),
        Value::Array(items) => items.iter().find_map(json_text),
        _ => None,
    }
}

fn first_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| object.get(*key).and_then(json_text))
}

fn json_engine(object: &Map<String, Value>) -> Option<String> {
    let engine = ENGINE_KEYS.iter().find_map(|key| object.get(*key))?;
    if let Some(displacement) = engine.get("engineDisplacement") {
        let value = displacement.get("value").and_then(json_text)?;
        return Some(format!("{value}L"));
    }
    json_text(engine)
}

fn json_vehicle(object: &Map<String, Value>) -> Option<ApplicationDraft> {
    let (start, end) = match (object.get("yearStart"), object.get("yearEnd")) {
        (Some(start), end) => (
            json_text(start)?.parse().ok()?,
            end.and_then(json_text).and_then(|e| e.parse().ok()),
        ),
        _ => parse_year_range(&first_text(object, YEAR_KEYS)?)?,
    };

    let mut draft = ApplicationDraft::new(
        start,
        first_text(object, MAKE_KEYS)?,
        first_text(object, MODEL_KEYS)?,
    )
    .with_trim(first_text(object, TRIM_KEYS))
    .with_engine(json_engine(object));
    draft.year_end = end;
    Some(draft)
}

fn microdata_vehicle(scope: ElementRef<'_>) -> Option<ApplicationDraft> {
    let mut props: HashMap<String, String> = HashMap::new();
    for prop in scope.select(&ITEMPROP) {
        let Some(name) = prop.value().attr("itemprop") else {
            continue;
        };
        let value = prop
            .value()
            .attr("content")
            .map(str::to_string)
            .unwrap_or_else(|| element_text(prop));
        if !value.trim().is_empty() {
            props.entry(name.to_string()).or_insert(value);
        }
    }

    let get = |keys: &[&str]| keys.iter().find_map(|k| props.get(*k).cloned());
    let (start, end) = parse_year_range(&get(YEAR_KEYS)?)?;

    let mut draft = ApplicationDraft::new(start, get(MAKE_KEYS)?, get(MODEL_KEYS)?)
        .with_trim(get(TRIM_KEYS))
        .with_engine(get(ENGINE_KEYS));
    draft.year_end = end;
    Some(draft)
}
