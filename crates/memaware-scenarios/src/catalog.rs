//! The default scenario matrix.

use memaware_common::error::{HarnessError, Result};

use crate::scenario::Scenario;

const HARD_LIMITS: [&str; 4] = ["100m", "500m", "1g", "4g"];
const SOFT_LIMITS: [&str; 2] = ["500m", "1g"];
const OOM_LIMIT: &str = "256m";
const METRICS_PAIRS: [(&str, &str); 3] = [("100M", "150M"), ("128M", "256M"), ("1G", "1500M")];

/// Returns every scenario in execution order.
///
/// # Errors
///
/// Returns an error if a matrix entry is not a valid memory size.
pub fn default_catalog() -> Result<Vec<Scenario>> {
    let mut catalog = Vec::new();
    for limit in HARD_LIMITS {
        catalog.push(Scenario::hard_limit(limit)?);
    }
    for reservation in SOFT_LIMITS {
        catalog.push(Scenario::soft_limit(reservation)?);
    }
    catalog.push(Scenario::out_of_memory(OOM_LIMIT)?);
    for (memory, swap) in METRICS_PAIRS {
        catalog.push(Scenario::metrics_api(memory, swap)?);
    }
    catalog.push(Scenario::ExceedsPhysical);
    Ok(catalog)
}

/// Keeps the scenarios matching any of `filters` by name or name prefix.
///
/// An empty filter list keeps everything.
///
/// # Errors
///
/// Returns [`HarnessError::Config`] if a filter matches nothing.
pub fn select(catalog: Vec<Scenario>, filters: &[String]) -> Result<Vec<Scenario>> {
    if filters.is_empty() {
        return Ok(catalog);
    }
    if let Some(unknown) = filters
        .iter()
        .find(|f| !catalog.iter().any(|s| s.matches_filter(f)))
    {
        return Err(HarnessError::Config {
            message: format!("no scenario matches '{unknown}'"),
        });
    }
    Ok(catalog
        .into_iter()
        .filter(|s| filters.iter().any(|f| s.matches_filter(f)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matrix_order() {
        let names: Vec<String> = default_catalog().unwrap().iter().map(Scenario::name).collect();
        assert_eq!(
            names,
            [
                "memory-limit-100m",
                "memory-limit-500m",
                "memory-limit-1g",
                "memory-limit-4g",
                "memory-soft-limit-500m",
                "memory-soft-limit-1g",
                "oom-256m",
                "os-mxbean-100M-150M",
                "os-mxbean-128M-256M",
                "os-mxbean-1G-1500M",
                "memory-exceeds-physical",
            ]
        );
    }

    #[test]
    fn hard_limit_bytes() {
        let catalog = default_catalog().unwrap();
        let bytes: Vec<u64> = catalog
            .iter()
            .filter_map(|s| match s {
                Scenario::HardLimit { limit } => Some(limit.bytes()),
                _ => None,
            })
            .collect();
        assert_eq!(bytes, [104_857_600, 524_288_000, 1_073_741_824, 4_294_967_296]);
    }

    #[test]
    fn select_by_prefix() {
        let selected = select(default_catalog().unwrap(), &["memory-limit".into()]).unwrap();
        assert_eq!(selected.len(), 4);
        let selected = select(default_catalog().unwrap(), &["oom-256m".into()]).unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn select_rejects_unknown() {
        let err = select(default_catalog().unwrap(), &["cpu".into()]).unwrap_err();
        assert!(err.to_string().contains("cpu"));
    }

    #[test]
    fn empty_filter_keeps_all() {
        assert_eq!(select(default_catalog().unwrap(), &[]).unwrap().len(), 11);
    }
}
