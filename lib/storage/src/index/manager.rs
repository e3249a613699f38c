use catalog::{IndexStructure, Persistence};
use common::ObjectId;
use dashmap::DashMap;
use getset::{CopyGetters, Getters};
use tracing::debug;

/// Handle to a built index structure.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct PhysicalIndex {
    #[getset(get_copy = "pub")]
    id: ObjectId,
    #[getset(get = "pub")]
    name: String,
    #[getset(get = "pub")]
    table_name: String,
    #[getset(get_copy = "pub")]
    structure: IndexStructure,
    #[getset(get_copy = "pub")]
    persistence: Persistence,
}

impl PhysicalIndex {
    pub fn new(
        id: ObjectId,
        name: impl Into<String>,
        table_name: impl Into<String>,
        structure: IndexStructure,
        persistence: Persistence,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            table_name: table_name.into(),
            structure,
            persistence,
        }
    }
}

/// Every index structure built in this process, keyed by object id.
#[derive(Debug, Default)]
pub struct IndexManager {
    indexes: DashMap<ObjectId, PhysicalIndex>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, index: PhysicalIndex) {
        debug!(id = %index.id(), name = %index.name(), structure = ?index.structure(), "physical index registered");
        self.indexes.insert(index.id(), index);
    }

    pub fn get(&self, id: ObjectId) -> Option<PhysicalIndex> {
        self.indexes.get(&id).map(|index| index.value().clone())
    }

    pub fn drop_index(&self, id: ObjectId) -> Option<PhysicalIndex> {
        self.indexes.remove(&id).map(|(_, index)| index)
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}
