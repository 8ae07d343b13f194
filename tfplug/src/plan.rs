//! Framework planning for PlanResourceChange
//!
//! Terraform sends a proposed new state that merges configuration with prior
//! state. This module turns it into the planned state: unknown computed
//! values, defaults, then attribute plan modifiers. A resource's own
//! `modify_plan` runs on the result afterwards.

use crate::schema::{DefaultRequest, PlanModifierRequest, Schema};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;
use tracing::debug;

pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn plan_resource_change(
    schema: &Schema,
    prior_state: &DynamicValue,
    proposed_new_state: &DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    // destroy plans pass through untouched
    if proposed_new_state.is_null() {
        return PlannedChange {
            planned_state: proposed_new_state.clone(),
            requires_replace: vec![],
            diagnostics: vec![],
        };
    }

    let creating = prior_state.is_null();
    let mut planned = entries(&schema.normalize(proposed_new_state));
    let prior = entries(prior_state);
    let config_entries = entries(config);
    let config_is_null = |name: &str| config_entries.get(name).map_or(true, Dynamic::is_null);

    for attr in &schema.block.attributes {
        if let Some(default) = &attr.default {
            if config_is_null(&attr.name) {
                let value = default
                    .default_value(DefaultRequest {
                        path: AttributePath::new(&attr.name),
                    })
                    .value;
                planned.insert(attr.name.clone(), value.value);
            }
        }
    }

    let changed = !creating
        && schema
            .block
            .attributes
            .iter()
            .filter(|attr| attr.is_configurable())
            .any(|attr| planned.get(&attr.name) != prior.get(&attr.name));

    if creating || changed {
        for attr in &schema.block.attributes {
            if attr.computed && attr.default.is_none() && config_is_null(&attr.name) {
                planned.insert(attr.name.clone(), Dynamic::Unknown);
            }
        }
    }
    debug!(creating, changed, "planned computed attributes");

    let mut requires_replace = Vec::new();
    let mut diagnostics = Vec::new();

    if !creating {
        for attr in &schema.block.attributes {
            if attr.plan_modifiers.is_empty() {
                continue;
            }
            let path = AttributePath::new(&attr.name);
            let mut plan_value = value_of(&planned, &attr.name);
            let mut replace = false;

            for modifier in &attr.plan_modifiers {
                let response = modifier.modify(PlanModifierRequest {
                    config_value: value_of(&config_entries, &attr.name),
                    state_value: value_of(&prior, &attr.name),
                    plan_value,
                    path: path.clone(),
                });
                plan_value = response.plan_value;
                replace |= response.requires_replace;
                diagnostics.extend(response.diagnostics);
            }

            if replace {
                debug!(attribute = %attr.name, "change requires replacement");
                requires_replace.push(path);
            }
            planned.insert(attr.name.clone(), plan_value.value);
        }
    }

    PlannedChange {
        planned_state: DynamicValue::new(Dynamic::Map(planned)),
        requires_replace,
        diagnostics,
    }
}

fn entries(value: &DynamicValue) -> HashMap<String, Dynamic> {
    match &value.value {
        Dynamic::Map(m) => m.clone(),
        _ => HashMap::new(),
    }
}

fn value_of(entries: &HashMap<String, Dynamic>, name: &str) -> DynamicValue {
    DynamicValue::new(entries.get(name).cloned().unwrap_or(Dynamic::Null))
}
