//! Part labels recovered from the STEP data section.
//!
//! The geometric table built by truck drops the product structure, so labels
//! are read straight from the exchange structure: a solid is named after the
//! product whose shape representation contains it, falling back to the
//! solid's and then the shell's own label.

use ruststep::ast::{DataSection, EntityInstance, Name, Parameter};
use std::collections::{BTreeSet, HashMap};

const SOLID_KEYWORDS: [&str; 2] = ["MANIFOLD_SOLID_BREP", "BREP_WITH_VOIDS"];

struct Entity<'a> {
    keyword: String,
    args: &'a [Parameter],
}

impl Entity<'_> {
    fn is(&self, keyword: &str) -> bool {
        self.keyword == keyword
    }

    fn string(&self, index: usize) -> Option<&str> {
        match self.args.get(index)? {
            Parameter::String(text) => named(text),
            _ => None,
        }
    }

    fn reference(&self, index: usize) -> Option<u64> {
        match self.args.get(index)? {
            Parameter::Ref(Name::Entity(id)) => Some(*id),
            _ => None,
        }
    }

    fn references(&self, index: usize) -> Vec<u64> {
        match self.args.get(index) {
            Some(Parameter::List(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Parameter::Ref(Name::Entity(id)) => Some(*id),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn named(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("NONE") {
        None
    } else {
        Some(text)
    }
}

pub(crate) struct DocumentIndex<'a> {
    entities: HashMap<u64, Entity<'a>>,
    solid_of_shell: HashMap<u64, u64>,
    representation_of_item: HashMap<u64, u64>,
    definition_of_representation: HashMap<u64, u64>,
    related_representations: HashMap<u64, Vec<u64>>,
}

impl<'a> DocumentIndex<'a> {
    pub(crate) fn new(data: &'a DataSection) -> Self {
        let mut entities = HashMap::new();
        for instance in &data.entities {
            // Complex instances only carry placements and contexts.
            if let EntityInstance::Simple { id, record } = instance {
                let args = match &record.parameter {
                    Parameter::List(items) => items.as_slice(),
                    single => std::slice::from_ref(single),
                };
                entities.insert(
                    *id,
                    Entity {
                        keyword: record.name.to_ascii_uppercase(),
                        args,
                    },
                );
            }
        }

        let mut index = Self {
            entities,
            solid_of_shell: HashMap::new(),
            representation_of_item: HashMap::new(),
            definition_of_representation: HashMap::new(),
            related_representations: HashMap::new(),
        };
        index.link();
        index
    }

    fn link(&mut self) {
        let mut ids: Vec<u64> = self.entities.keys().copied().collect();
        ids.sort_unstable();

        for id in ids {
            let entity = &self.entities[&id];
            if SOLID_KEYWORDS.iter().any(|keyword| entity.is(keyword)) {
                if let Some(shell) = entity.reference(1) {
                    self.solid_of_shell.entry(shell).or_insert(id);
                }
            } else if entity.keyword.ends_with("SHAPE_REPRESENTATION") {
                for item in entity.references(1) {
                    self.representation_of_item.entry(item).or_insert(id);
                }
            } else if entity.is("SHAPE_DEFINITION_REPRESENTATION") {
                if let (Some(definition), Some(representation)) =
                    (entity.reference(0), entity.reference(1))
                {
                    self.definition_of_representation
                        .entry(representation)
                        .or_insert(definition);
                }
            } else if entity.is("SHAPE_REPRESENTATION_RELATIONSHIP") {
                if let (Some(first), Some(second)) = (entity.reference(2), entity.reference(3)) {
                    self.related_representations
                        .entry(first)
                        .or_default()
                        .push(second);
                    self.related_representations
                        .entry(second)
                        .or_default()
                        .push(first);
                }
            }
        }
    }

    /// Outer shells of every solid, in ascending entity id.
    pub(crate) fn solid_shells(&self) -> Vec<u64> {
        self.solid_of_shell
            .keys()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub(crate) fn label_for_shell(&self, shell: u64) -> Option<String> {
        let solid = self.solid_of_shell.get(&shell).copied();
        let product = solid.and_then(|solid| self.product_name_for_item(solid));
        let solid_label = solid.and_then(|solid| self.label(solid));
        product
            .or(solid_label)
            .or_else(|| self.label(shell))
            .map(str::to_string)
    }

    fn label(&self, id: u64) -> Option<&str> {
        self.entities.get(&id)?.string(0)
    }

    fn product_name_for_item(&self, item: u64) -> Option<&str> {
        let representation = *self.representation_of_item.get(&item)?;
        if let Some(name) = self.product_name_for_representation(representation) {
            return Some(name);
        }
        self.related_representations
            .get(&representation)?
            .iter()
            .find_map(|related| self.product_name_for_representation(*related))
    }

    fn product_name_for_representation(&self, representation: u64) -> Option<&str> {
        let definition_shape = *self.definition_of_representation.get(&representation)?;
        let definition = self.follow(definition_shape, "PRODUCT_DEFINITION_SHAPE", 2)?;
        let formation = self.follow(definition, "PRODUCT_DEFINITION", 2)?;
        let product = self
            .follow(formation, "PRODUCT_DEFINITION_FORMATION", 2)
            .or_else(|| {
                self.follow(
                    formation,
                    "PRODUCT_DEFINITION_FORMATION_WITH_SPECIFIED_SOURCE",
                    2,
                )
            })?;
        let product = self.entities.get(&product).filter(|e| e.is("PRODUCT"))?;
        product.string(1).or_else(|| product.string(0))
    }

    fn follow(&self, id: u64, keyword: &str, index: usize) -> Option<u64> {
        let entity = self.entities.get(&id).filter(|e| e.is(keyword))?;
        entity.reference(index)
    }
}
