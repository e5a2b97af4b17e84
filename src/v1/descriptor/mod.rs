pub mod endpoint;
pub mod function;

use std::collections::{BTreeSet, HashMap};

use daggy::{stable_dag::StableDag, NodeIndex};
use petgraph::algo::toposort;
use serde::{Deserialize, Serialize};
use strum_macros::EnumString;
use thiserror::Error;

use endpoint::EndpointResource;
use function::FunctionResource;

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, strum_macros::Display,
)]
pub enum ResourceKind {
    Function,
    Endpoint,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum ResourceSpec {
    Function(FunctionResource),
    Endpoint(EndpointResource),
}

impl ResourceSpec {
    pub fn id(&self) -> &str {
        match self {
            ResourceSpec::Function(f) => &f.id,
            ResourceSpec::Endpoint(e) => &e.id,
        }
    }
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceSpec::Function(_) => ResourceKind::Function,
            ResourceSpec::Endpoint(_) => ResourceKind::Endpoint,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    /// `from` forwards requests to `to`.
    Invokes,
    /// `from` needs `to` to exist first.
    DependsOn,
}

/// `from` needs `to` applied first, whatever the relation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub relation: Relation,
}

/// Declarative description of everything one deployment owns.
///
/// Nothing here talks to a platform: the descriptor is data that a
/// [`Plan`](crate::v1::plan::Plan) walks in dependency order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentDescriptor {
    pub name: String,
    pub resources: Vec<ResourceSpec>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<(String, String)>,
}

impl DeploymentDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_function(&mut self, function: FunctionResource) -> Result<String, DescriptorError> {
        function.validate()?;
        self.add(ResourceSpec::Function(function))
    }

    /// The referenced function must already be part of the descriptor.
    pub fn add_endpoint(&mut self, endpoint: EndpointResource) -> Result<String, DescriptorError> {
        self.check_target(&endpoint)?;
        self.add(ResourceSpec::Endpoint(endpoint))
    }

    pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<(), DescriptorError> {
        for id in [from, to] {
            if self.resource(id).is_none() {
                return Err(DescriptorError::UnknownResource(id.to_string()));
            }
        }
        let pair = (from.to_string(), to.to_string());
        self.depends_on.insert(pair.clone());
        if let Err(err) = self.graph() {
            self.depends_on.remove(&pair);
            return Err(err);
        }
        Ok(())
    }

    fn add(&mut self, spec: ResourceSpec) -> Result<String, DescriptorError> {
        let id = spec.id().to_string();
        if id.trim().is_empty() {
            return Err(DescriptorError::EmptyId);
        }
        if self.resource(&id).is_some() {
            return Err(DescriptorError::DuplicateResource(id));
        }
        tracing::debug!("Declare {}[{}]", spec.kind(), id);
        self.resources.push(spec);
        Ok(id)
    }

    fn check_target(&self, endpoint: &EndpointResource) -> Result<(), DescriptorError> {
        match self.resource(&endpoint.handler) {
            Some(ResourceSpec::Function(_)) => Ok(()),
            Some(other) => Err(DescriptorError::InvalidTarget {
                endpoint: endpoint.id.clone(),
                target: other.id().to_string(),
            }),
            None => Err(DescriptorError::UnknownResource(endpoint.handler.clone())),
        }
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceSpec> {
        self.resources.iter().find(|r| r.id() == id)
    }
    pub fn function(&self, id: &str) -> Option<&FunctionResource> {
        match self.resource(id) {
            Some(ResourceSpec::Function(f)) => Some(f),
            _ => None,
        }
    }
    pub fn endpoint(&self, id: &str) -> Option<&EndpointResource> {
        match self.resource(id) {
            Some(ResourceSpec::Endpoint(e)) => Some(e),
            _ => None,
        }
    }
    pub fn ids(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.id().to_string()).collect()
    }

    pub fn edges(&self) -> Vec<Edge> {
        let invokes = self.resources.iter().filter_map(|r| match r {
            ResourceSpec::Endpoint(e) => Some(Edge {
                from: e.id.clone(),
                to: e.handler.clone(),
                relation: Relation::Invokes,
            }),
            ResourceSpec::Function(_) => None,
        });
        let depends_on = self.depends_on.iter().map(|(from, to)| Edge {
            from: from.clone(),
            to: to.clone(),
            relation: Relation::DependsOn,
        });
        invokes.chain(depends_on).collect()
    }

    /// Ids `id` needs applied before itself.
    pub fn dependencies(&self, id: &str) -> BTreeSet<String> {
        self.edges()
            .into_iter()
            .filter(|edge| edge.from == id)
            .map(|edge| edge.to)
            .collect()
    }

    /// Function the endpoint forwards `method` `path` to.
    pub fn route(&self, endpoint: &str, method: &str, path: &str) -> Option<&FunctionResource> {
        self.endpoint(endpoint)
            .and_then(|e| self.function(e.route(method, path)))
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        let mut seen = BTreeSet::new();
        for resource in &self.resources {
            if resource.id().trim().is_empty() {
                return Err(DescriptorError::EmptyId);
            }
            if !seen.insert(resource.id()) {
                return Err(DescriptorError::DuplicateResource(resource.id().to_string()));
            }
            match resource {
                ResourceSpec::Function(f) => f.validate()?,
                ResourceSpec::Endpoint(e) => self.check_target(e)?,
            }
        }
        self.graph().map(|_| ())
    }

    pub fn graph(&self) -> Result<ResourceGraph, DescriptorError> {
        let mut index = HashMap::<String, NodeIndex>::new();
        let mut dag = StableDag::<String, Relation, u32>::new();
        for resource in &self.resources {
            let idx = dag.add_node(resource.id().to_string());
            index.insert(resource.id().to_string(), idx);
        }
        for edge in self.edges() {
            let from = index
                .get(&edge.from)
                .ok_or_else(|| DescriptorError::UnknownResource(edge.from.clone()))?;
            let to = index
                .get(&edge.to)
                .ok_or_else(|| DescriptorError::UnknownResource(edge.to.clone()))?;
            // Dependency first: the edge points from the prerequisite to the dependent.
            dag.add_edge(*to, *from, edge.relation)
                .map_err(|_| DescriptorError::Cycle(format!("{} -> {}", edge.from, edge.to)))?;
        }
        Ok(ResourceGraph { dag })
    }

    /// Ids in the order a provisioning engine must create them.
    pub fn apply_order(&self) -> Result<Vec<String>, DescriptorError> {
        self.graph()?.sorted()
    }

    pub fn teardown_order(&self) -> Result<Vec<String>, DescriptorError> {
        let mut order = self.apply_order()?;
        order.reverse();
        Ok(order)
    }

    pub fn to_json(&self) -> Result<String, DescriptorError> {
        serde_json::to_string_pretty(self).map_err(DescriptorError::Json)
    }
    pub fn from_json(json: &str) -> Result<Self, DescriptorError> {
        let descriptor: Self = serde_json::from_str(json).map_err(DescriptorError::Json)?;
        descriptor.validate()?;
        Ok(descriptor)
    }
}

pub struct ResourceGraph {
    dag: StableDag<String, Relation, u32>,
}

impl ResourceGraph {
    pub fn node_count(&self) -> usize {
        self.dag.graph().node_count()
    }
    pub fn edge_count(&self) -> usize {
        self.dag.graph().edge_count()
    }
    pub fn sorted(&self) -> Result<Vec<String>, DescriptorError> {
        let sorted = toposort(self.dag.graph(), None)
            .map_err(|cycle| DescriptorError::Cycle(format!("{:?}", cycle.node_id())))?;
        Ok(sorted
            .into_iter()
            .filter_map(|idx| self.dag.node_weight(idx).cloned())
            .collect())
    }
}

/// Orders arbitrary ids given each one's prerequisites. Prerequisites that are
/// not part of `items` are ignored.
pub fn sort_by_dependencies(
    items: &[(String, BTreeSet<String>)],
) -> Result<Vec<String>, DescriptorError> {
    let mut index = HashMap::<&str, NodeIndex>::new();
    let mut dag = StableDag::<String, Relation, u32>::new();
    for (id, _) in items {
        index.insert(id.as_str(), dag.add_node(id.clone()));
    }
    for (id, deps) in items {
        for dep in deps {
            if let Some(dep_idx) = index.get(dep.as_str()) {
                dag.add_edge(*dep_idx, index[id.as_str()], Relation::DependsOn)
                    .map_err(|_| DescriptorError::Cycle(format!("{} -> {}", id, dep)))?;
            }
        }
    }
    ResourceGraph { dag }.sorted()
}

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Resource id cannot be empty")]
    EmptyId,
    #[error("Resource {0} is declared twice")]
    DuplicateResource(String),
    #[error("Resource {0} is not declared")]
    UnknownResource(String),
    #[error("Endpoint {endpoint} must target a function, {target} is not one")]
    InvalidTarget { endpoint: String, target: String },
    #[error("Dependency cycle through {0}")]
    Cycle(String),
    #[error("Invalid entry point: {0}")]
    InvalidEntryPoint(String),
    #[error("Invalid bundling configuration: {0}")]
    InvalidBundling(String),
    #[error("Invalid function: {0}")]
    InvalidFunction(String),
    #[error("Descriptor JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::endpoint::EndpointResource;
    use super::function::{EntryPoint, FunctionResource};
    use super::*;

    fn descriptor() -> DeploymentDescriptor {
        let mut d = DeploymentDescriptor::new("test");
        d.add_function(FunctionResource::new(
            "Fn",
            EntryPoint::new("hello", "handler"),
        ))
        .unwrap();
        d.add_endpoint(EndpointResource::new("Api", "Fn")).unwrap();
        d
    }

    #[test]
    fn endpoint_is_applied_after_its_function() {
        let d = descriptor();
        assert_eq!(d.apply_order().unwrap(), vec!["Fn", "Api"]);
        assert_eq!(d.teardown_order().unwrap(), vec!["Api", "Fn"]);
    }

    #[test]
    fn endpoint_invokes_its_function() {
        let d = descriptor();
        assert_eq!(
            d.edges(),
            vec![Edge {
                from: "Api".to_string(),
                to: "Fn".to_string(),
                relation: Relation::Invokes,
            }]
        );
        assert_eq!(d.dependencies("Api").into_iter().collect::<Vec<_>>(), vec!["Fn"]);
        assert!(d.dependencies("Fn").is_empty());
        let graph = d.graph().unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn any_route_resolves_to_the_single_function() {
        let d = descriptor();
        for (method, path) in [("GET", "/"), ("POST", "/foo/bar"), ("DELETE", "/x/y/z")] {
            assert_eq!(d.route("Api", method, path).map(|f| f.id.as_str()), Some("Fn"));
        }
        assert!(d.route("Missing", "GET", "/").is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut d = descriptor();
        let err = d
            .add_function(FunctionResource::new("Fn", EntryPoint::new("a", "b")))
            .unwrap_err();
        assert!(matches!(err, DescriptorError::DuplicateResource(id) if id == "Fn"));
    }

    #[test]
    fn endpoint_must_target_a_declared_function() {
        let mut d = descriptor();
        assert!(matches!(
            d.add_endpoint(EndpointResource::new("Api2", "Nope")),
            Err(DescriptorError::UnknownResource(_))
        ));
        assert!(matches!(
            d.add_endpoint(EndpointResource::new("Api2", "Api")),
            Err(DescriptorError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn explicit_dependency_cycles_are_rejected() {
        let mut d = descriptor();
        assert!(matches!(
            d.add_dependency("Fn", "Api"),
            Err(DescriptorError::Cycle(_))
        ));
    }

    #[test]
    fn explicit_dependencies_shape_the_order() {
        let mut d = descriptor();
        d.add_function(FunctionResource::new("Other", EntryPoint::new("other", "handler")))
            .unwrap();
        d.add_dependency("Fn", "Other").unwrap();
        let order = d.apply_order().unwrap();
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        assert!(pos("Other") < pos("Fn"));
        assert!(pos("Fn") < pos("Api"));
    }

    #[test]
    fn json_round_trip_keeps_the_descriptor() {
        let d = descriptor();
        let parsed = DeploymentDescriptor::from_json(&d.to_json().unwrap()).unwrap();
        assert_eq!(parsed, d);
    }

    #[test]
    fn loading_validates_references() {
        let json = r#"{
            "name": "broken",
            "resources": [
                {"kind": "Endpoint", "id": "Api", "handler": "Ghost"}
            ]
        }"#;
        assert!(matches!(
            DeploymentDescriptor::from_json(json),
            Err(DescriptorError::UnknownResource(_))
        ));
    }

    #[test]
    fn sorting_ignores_prerequisites_outside_the_set() {
        let items = vec![
            ("b".to_string(), BTreeSet::from(["a".to_string(), "gone".to_string()])),
            ("a".to_string(), BTreeSet::new()),
        ];
        assert_eq!(sort_by_dependencies(&items).unwrap(), vec!["a", "b"]);
    }
}
