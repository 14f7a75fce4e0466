//! Layer descriptors and the data-driven layer registry.
//!
//! A layer is a named category of remote source data (ROADS, COUNTY, ...).
//! The set of layers is configuration data: built-in defaults are overlaid
//! by `[layer.NAME]` sections of the config file.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Tolerance applied when neither the layer nor the processing config sets one.
pub const DEFAULT_TOLERANCE: f64 = 0.005;

/// Whether a layer carries geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerKind {
    #[default]
    Spatial,
    /// Tabular only; accepted but not processed yet.
    Relationship,
}

/// Geometry carried by a spatial layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    Polyline,
    Polygon,
}

impl FromStr for LayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spatial" => Ok(LayerKind::Spatial),
            "relationship" => Ok(LayerKind::Relationship),
            other => Err(format!("unknown layer kind '{}'", other)),
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Spatial => write!(f, "spatial"),
            LayerKind::Relationship => write!(f, "relationship"),
        }
    }
}

impl FromStr for GeometryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "point" => Ok(GeometryKind::Point),
            "polyline" | "line" => Ok(GeometryKind::Polyline),
            "polygon" => Ok(GeometryKind::Polygon),
            other => Err(format!("unknown geometry kind '{}'", other)),
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryKind::Point => write!(f, "point"),
            GeometryKind::Polyline => write!(f, "polyline"),
            GeometryKind::Polygon => write!(f, "polygon"),
        }
    }
}

/// Configuration for one remote data category.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor {
    pub name: String,
    pub enabled: bool,
    pub kind: LayerKind,
    pub geometry: Option<GeometryKind>,
    /// Overrides the processing base tolerance.
    pub tolerance: Option<f64>,
    /// Glob patterns; matching source files are never downloaded.
    pub skip_patterns: Vec<String>,
}

impl LayerDescriptor {
    /// An enabled spatial layer with the given geometry.
    pub fn spatial(name: impl Into<String>, geometry: GeometryKind) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            kind: LayerKind::Spatial,
            geometry: Some(geometry),
            tolerance: None,
            skip_patterns: Vec::new(),
        }
    }

    /// A disabled relationship layer.
    pub fn relationship(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
            kind: LayerKind::Relationship,
            geometry: None,
            tolerance: None,
            skip_patterns: Vec::new(),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn with_skip_patterns(mut self, patterns: Vec<String>) -> Self {
        self.skip_patterns = patterns;
        self
    }

    /// Whether `filename` matches any skip pattern.
    pub fn should_skip(&self, filename: &str) -> bool {
        self.skip_match(filename).is_some()
    }

    /// First skip pattern matching `filename`, if any.
    pub fn skip_match(&self, filename: &str) -> Option<&str> {
        self.skip_patterns
            .iter()
            .find(|pattern| glob_match::glob_match(pattern, filename))
            .map(String::as_str)
    }

    /// Layer override, else processing base, else [`DEFAULT_TOLERANCE`].
    pub fn resolve_tolerance(&self, base_tolerance: Option<f64>) -> f64 {
        self.tolerance
            .or(base_tolerance)
            .unwrap_or(DEFAULT_TOLERANCE)
    }
}

/// Mapping of layer name → descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerRegistry {
    layers: BTreeMap<String, LayerDescriptor>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Common spatial layers enabled, relationship tables disabled.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for name in ["PRIMARYROADS", "PRISECROADS"] {
            registry.insert(LayerDescriptor::spatial(name, GeometryKind::Polyline));
        }
        for name in ["STATE", "COUNTY", "TRACT", "PLACE"] {
            registry.insert(LayerDescriptor::spatial(name, GeometryKind::Polygon));
        }
        for name in ["ADDR", "ADDRFEAT"] {
            registry.insert(LayerDescriptor::relationship(name));
        }
        registry
    }

    /// Insert or replace a descriptor.
    pub fn insert(&mut self, layer: LayerDescriptor) {
        self.layers.insert(layer.name.clone(), layer);
    }

    pub fn get(&self, name: &str) -> Option<&LayerDescriptor> {
        self.layers.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut LayerDescriptor> {
        self.layers.get_mut(name)
    }

    /// Unknown layers are disabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.layers.get(name).is_some_and(|l| l.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerDescriptor> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = LayerRegistry::with_defaults();

        assert!(registry.is_enabled("COUNTY"));
        assert!(registry.is_enabled("PRIMARYROADS"));
        assert_eq!(
            registry.get("PRISECROADS").unwrap().geometry,
            Some(GeometryKind::Polyline)
        );
        assert!(!registry.is_enabled("ADDR"));
        assert_eq!(
            registry.get("ADDRFEAT").unwrap().kind,
            LayerKind::Relationship
        );
    }

    #[test]
    fn test_unknown_layer_is_disabled() {
        let registry = LayerRegistry::with_defaults();
        assert!(!registry.is_enabled("ROADS"));
    }

    #[test]
    fn test_tolerance_resolution_order() {
        let plain = LayerDescriptor::spatial("ROADS", GeometryKind::Polyline);
        let overridden = plain.clone().with_tolerance(0.0001);

        assert_eq!(overridden.resolve_tolerance(Some(0.01)), 0.0001);
        assert_eq!(plain.resolve_tolerance(Some(0.01)), 0.01);
        assert_eq!(plain.resolve_tolerance(None), DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_skip_patterns() {
        let layer = LayerDescriptor::spatial("ROADS", GeometryKind::Polyline)
            .with_skip_patterns(vec!["tl_2023_72*".to_string(), "*_old.zip".to_string()]);

        assert_eq!(layer.skip_match("tl_2023_72001_roads.zip"), Some("tl_2023_72*"));
        assert_eq!(layer.skip_match("roads_old.zip"), Some("*_old.zip"));
        assert_eq!(layer.skip_match("tl_2023_01001_roads.zip"), None);
        assert!(!layer.should_skip("tl_2023_01001_roads.zip"));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("SPATIAL".parse::<LayerKind>(), Ok(LayerKind::Spatial));
        assert_eq!(
            "relationship".parse::<LayerKind>(),
            Ok(LayerKind::Relationship)
        );
        assert!("tabular".parse::<LayerKind>().is_err());
        assert_eq!("POLYLINE".parse::<GeometryKind>(), Ok(GeometryKind::Polyline));
        assert!("raster".parse::<GeometryKind>().is_err());
    }
}
