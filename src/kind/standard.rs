//! Каталог видов сообщений приложения.
//!
//! ```text
//! Message
//! ├── Error
//! ├── Settings
//! ├── Computation
//! │   ├── ComputationStarted
//! │   └── ComputationFinished
//! ├── Dataset
//! │   ├── DatasetChanged
//! │   │   ├── NumericalDataChanged
//! │   │   ├── ComponentsChanged
//! │   │   └── ComponentReplaced
//! │   └── DatasetRenamed
//! ├── DataCollection
//! │   ├── DataCollectionAdd
//! │   └── DataCollectionDelete
//! ├── Subset
//! │   ├── SubsetCreate
//! │   ├── SubsetUpdate
//! │   └── SubsetDelete
//! ├── Selection
//! │   └── SelectionChanged
//! ├── LayerArtistUpdated
//! └── AddToReport
//! ```

use std::sync::Arc;

use messenger_error::KindTreeError;
use once_cell::sync::Lazy;

use super::{KindId, KindTree};

static STANDARD: Lazy<StandardKinds> =
    Lazy::new(|| StandardKinds::build().expect("standard kind catalog is well-formed"));

/// Возвращает общий для процесса каталог стандартных видов.
pub fn standard() -> &'static StandardKinds {
    &STANDARD
}

/// Стандартные виды сообщений и дерево, в котором они объявлены.
#[derive(Debug)]
pub struct StandardKinds {
    tree: Arc<KindTree>,
    pub message: KindId,
    pub error: KindId,
    pub settings: KindId,
    pub computation: KindId,
    pub computation_started: KindId,
    pub computation_finished: KindId,
    pub dataset: KindId,
    pub dataset_changed: KindId,
    pub numerical_data_changed: KindId,
    pub components_changed: KindId,
    pub component_replaced: KindId,
    pub dataset_renamed: KindId,
    pub data_collection: KindId,
    pub data_collection_add: KindId,
    pub data_collection_delete: KindId,
    pub subset: KindId,
    pub subset_create: KindId,
    pub subset_update: KindId,
    pub subset_delete: KindId,
    pub selection: KindId,
    pub selection_changed: KindId,
    pub layer_artist_updated: KindId,
    pub add_to_report: KindId,
}

impl StandardKinds {
    /// Дерево стандартных видов.
    pub fn tree(&self) -> &Arc<KindTree> {
        &self.tree
    }

    fn build() -> Result<Self, KindTreeError> {
        let mut b = KindTree::builder("Message");
        let message = b.root();

        let error = b.kind("Error", message)?;
        let settings = b.kind("Settings", message)?;

        let computation = b.kind("Computation", message)?;
        let computation_started = b.kind("ComputationStarted", computation)?;
        let computation_finished = b.kind("ComputationFinished", computation)?;

        let dataset = b.kind("Dataset", message)?;
        let dataset_changed = b.kind("DatasetChanged", dataset)?;
        let numerical_data_changed = b.kind("NumericalDataChanged", dataset_changed)?;
        let components_changed = b.kind("ComponentsChanged", dataset_changed)?;
        let component_replaced = b.kind("ComponentReplaced", dataset_changed)?;
        let dataset_renamed = b.kind("DatasetRenamed", dataset)?;

        let data_collection = b.kind("DataCollection", message)?;
        let data_collection_add = b.kind("DataCollectionAdd", data_collection)?;
        let data_collection_delete = b.kind("DataCollectionDelete", data_collection)?;

        let subset = b.kind("Subset", message)?;
        let subset_create = b.kind("SubsetCreate", subset)?;
        let subset_update = b.kind("SubsetUpdate", subset)?;
        let subset_delete = b.kind("SubsetDelete", subset)?;

        let selection = b.kind("Selection", message)?;
        let selection_changed = b.kind("SelectionChanged", selection)?;

        let layer_artist_updated = b.kind("LayerArtistUpdated", message)?;
        let add_to_report = b.kind("AddToReport", message)?;

        Ok(Self {
            tree: Arc::new(b.build()?),
            message,
            error,
            settings,
            computation,
            computation_started,
            computation_finished,
            dataset,
            dataset_changed,
            numerical_data_changed,
            components_changed,
            component_replaced,
            dataset_renamed,
            data_collection,
            data_collection_add,
            data_collection_delete,
            subset,
            subset_create,
            subset_update,
            subset_delete,
            selection,
            selection_changed,
            layer_artist_updated,
            add_to_report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_shared() {
        assert!(std::ptr::eq(standard(), standard()));
        assert!(Arc::ptr_eq(standard().tree(), standard().tree()));
    }

    /// Тест проверяет положение нескольких видов в иерархии.
    #[test]
    fn test_catalog_shape() {
        let k = standard();
        let tree = k.tree();
        assert_eq!(tree.len(), 23);
        assert_eq!(tree.root(), k.message);
        assert_eq!(tree.depth(k.numerical_data_changed), Some(3));
        assert!(tree.is_ancestor_or_self(k.dataset, k.component_replaced));
        assert!(tree.is_ancestor_or_self(k.dataset_changed, k.components_changed));
        assert!(!tree.is_ancestor_or_self(k.subset, k.dataset_changed));
        assert_eq!(tree.lookup("SubsetUpdate"), Some(k.subset_update));
    }
}
