//! Catalog search and filtering.
//!
//! All string matching is case-insensitive substring. Results are sorted
//! by URI so equal inputs always produce the same ordering.

use crate::types::{PluginInfo, PluginSearchCriteria};
use std::collections::HashMap;

/// Free-text search against name, author, comment and URI.
pub fn search_by_text(query: &str, catalog: &HashMap<String, PluginInfo>) -> Vec<PluginInfo> {
    if query.is_empty() {
        return sorted(catalog.values().cloned().collect());
    }

    let query = query.to_lowercase();
    sorted(
        catalog
            .values()
            .filter(|plugin| matches_query(plugin, &query))
            .cloned()
            .collect(),
    )
}

/// Filter by every set field of the criteria.
pub fn filter_plugins(
    criteria: &PluginSearchCriteria,
    catalog: &HashMap<String, PluginInfo>,
) -> Vec<PluginInfo> {
    sorted(
        catalog
            .values()
            .filter(|plugin| matches_criteria(plugin, criteria))
            .cloned()
            .collect(),
    )
}

fn sorted(mut plugins: Vec<PluginInfo>) -> Vec<PluginInfo> {
    plugins.sort_by(|a, b| a.uri.cmp(&b.uri));
    plugins
}

fn matches_query(plugin: &PluginInfo, query_lower: &str) -> bool {
    let haystack = format!(
        "{} {} {} {}",
        plugin.name, plugin.author.name, plugin.comment, plugin.uri
    )
    .to_lowercase();
    haystack.contains(query_lower)
}

fn matches_criteria(plugin: &PluginInfo, criteria: &PluginSearchCriteria) -> bool {
    if !criteria.category.is_empty() {
        let wanted = criteria.category.to_lowercase();
        let found = plugin
            .category
            .iter()
            .any(|category| category.to_lowercase().contains(&wanted));
        if !found {
            return false;
        }
    }

    if !criteria.author.is_empty()
        && !plugin
            .author
            .name
            .to_lowercase()
            .contains(&criteria.author.to_lowercase())
    {
        return false;
    }

    let audio_inputs = plugin.ports.audio_inputs.len() as i32;
    let audio_outputs = plugin.ports.audio_outputs.len() as i32;

    if let Some(min) = criteria.min_audio_inputs {
        if audio_inputs < min {
            return false;
        }
    }
    if let Some(min) = criteria.min_audio_outputs {
        if audio_outputs < min {
            return false;
        }
    }
    if let Some(max) = criteria.max_audio_inputs {
        if audio_inputs > max {
            return false;
        }
    }
    if let Some(max) = criteria.max_audio_outputs {
        if audio_outputs > max {
            return false;
        }
    }

    if !criteria.has_parameter.is_empty() && !has_parameter(plugin, &criteria.has_parameter) {
        return false;
    }

    true
}

/// Match a control port by name or symbol substring.
fn has_parameter(plugin: &PluginInfo, parameter: &str) -> bool {
    let wanted = parameter.to_lowercase();
    plugin
        .ports
        .control_inputs
        .iter()
        .chain(plugin.ports.control_outputs.iter())
        .any(|port| {
            port.name.to_lowercase().contains(&wanted)
                || port.symbol.to_lowercase().contains(&wanted)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PluginAuthor, PluginPort, PluginPorts};

    fn audio_ports(count: usize) -> Vec<PluginPort> {
        (0..count as u32)
            .map(|index| PluginPort {
                index,
                symbol: format!("audio_{index}"),
                name: format!("Audio {index}"),
                ..Default::default()
            })
            .collect()
    }

    fn plugin(uri: &str, name: &str, category: &str, inputs: usize, outputs: usize) -> PluginInfo {
        PluginInfo {
            uri: uri.into(),
            name: name.into(),
            category: vec![category.into()],
            author: PluginAuthor {
                name: "Example Audio".into(),
                ..Default::default()
            },
            ports: PluginPorts {
                audio_inputs: audio_ports(inputs),
                audio_outputs: audio_ports(outputs),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn catalog() -> HashMap<String, PluginInfo> {
        let mut catalog = HashMap::new();
        for info in [
            plugin("urn:a", "Big Hall", "Reverb", 2, 2),
            plugin("urn:b", "Tape Echo", "Delay", 1, 1),
            plugin("urn:c", "Fuzz", "Distortion", 2, 2),
        ] {
            catalog.insert(info.uri.clone(), info);
        }
        catalog
    }

    #[test]
    fn test_criteria_category_and_min_inputs() {
        let criteria = PluginSearchCriteria {
            category: "rev".into(),
            min_audio_inputs: Some(2),
            ..Default::default()
        };
        let results = filter_plugins(&criteria, &catalog());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uri, "urn:a");
    }

    #[test]
    fn test_criteria_max_bounds() {
        let criteria = PluginSearchCriteria {
            max_audio_inputs: Some(1),
            ..Default::default()
        };
        let results = filter_plugins(&criteria, &catalog());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uri, "urn:b");
    }

    #[test]
    fn test_unset_bounds_are_wildcards() {
        let results = filter_plugins(&PluginSearchCriteria::default(), &catalog());
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_criteria_author_substring() {
        let criteria = PluginSearchCriteria {
            author: "example".into(),
            ..Default::default()
        };
        assert_eq!(filter_plugins(&criteria, &catalog()).len(), 3);

        let criteria = PluginSearchCriteria {
            author: "someone else".into(),
            ..Default::default()
        };
        assert!(filter_plugins(&criteria, &catalog()).is_empty());
    }

    #[test]
    fn test_criteria_has_parameter() {
        let mut catalog = catalog();
        catalog.get_mut("urn:b").unwrap().ports.control_inputs = vec![PluginPort {
            index: 0,
            symbol: "feedback".into(),
            name: "Feedback".into(),
            ..Default::default()
        }];
        let criteria = PluginSearchCriteria {
            has_parameter: "feed".into(),
            ..Default::default()
        };
        let results = filter_plugins(&criteria, &catalog);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uri, "urn:b");
    }

    #[test]
    fn test_text_search_is_case_insensitive() {
        let results = search_by_text("TAPE", &catalog());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Tape Echo");
    }

    #[test]
    fn test_text_search_matches_uri() {
        let results = search_by_text("urn:c", &catalog());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Fuzz");
    }

    #[test]
    fn test_empty_query_returns_everything_sorted() {
        let results = search_by_text("", &catalog());
        let uris: Vec<&str> = results.iter().map(|p| p.uri.as_str()).collect();
        assert_eq!(uris, vec!["urn:a", "urn:b", "urn:c"]);
    }
}
