use std::{
    fmt,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use messenger_error::KindTreeError;
use rustc_hash::FxHashMap;

/// Максимальное количество видов в одном дереве.
pub const MAX_KINDS: usize = u16::MAX as usize;

/// Счётчик идентификаторов деревьев: вид из чужого дерева не распознаётся.
static NEXT_TREE_ID: AtomicU32 = AtomicU32::new(1);

/// Идентификатор вида сообщения.
///
/// Хранит номер дерева, в котором объявлен, и позицию внутри него.
/// Копируется бесплатно, сравнивается и хешируется как пара чисел.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KindId {
    tree: u32,
    index: u16,
}

impl KindId {
    /// Позиция вида в своём дереве (у корня `0`).
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Идентификатор дерева, в котором объявлен вид.
    pub fn tree_id(self) -> u32 {
        self.tree
    }
}

impl fmt::Debug for KindId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "KindId({}#{})", self.tree, self.index)
    }
}

#[derive(Debug, Clone)]
struct KindNode {
    name: Arc<str>,
    parent: Option<u16>,
    depth: u16,
    /// Номер входа при обходе в глубину.
    enter: u32,
    /// Номер выхода при обходе в глубину.
    exit: u32,
}

/// Неизменяемая иерархия видов сообщений с единственным корнем.
///
/// Все запросы (`depth`, `is_ancestor_or_self`, `parent`) выполняются за
/// O(1): при сборке дерево обходится один раз, и каждый вид получает
/// интервал `[enter, exit]`. Вид `a` является предком `d` (или самим `d`)
/// тогда и только тогда, когда интервал `d` вложен в интервал `a`.
#[derive(Clone)]
pub struct KindTree {
    id: u32,
    nodes: Vec<KindNode>,
    by_name: FxHashMap<Arc<str>, u16>,
}

impl KindTree {
    /// Начинает объявление дерева с корневым видом `root`.
    pub fn builder(root: impl Into<Arc<str>>) -> KindTreeBuilder {
        KindTreeBuilder::new(root.into())
    }

    /// Идентификатор дерева.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Корневой вид, общий для всех видов дерева.
    pub fn root(&self) -> KindId {
        self.id_at(0)
    }

    /// Количество видов, включая корень.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Дерево всегда содержит хотя бы корень.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Распознаётся ли вид этим деревом.
    pub fn contains(
        &self,
        kind: KindId,
    ) -> bool {
        kind.tree == self.id && kind.index() < self.nodes.len()
    }

    /// Поиск вида по имени.
    pub fn lookup(
        &self,
        name: &str,
    ) -> Option<KindId> {
        self.by_name.get(name).map(|&index| self.id_at(index))
    }

    /// Имя вида или `None`, если вид чужой.
    pub fn name(
        &self,
        kind: KindId,
    ) -> Option<&str> {
        self.node(kind).map(|n| &*n.name)
    }

    /// Расстояние от корня (у корня `0`).
    pub fn depth(
        &self,
        kind: KindId,
    ) -> Option<usize> {
        self.node(kind).map(|n| n.depth as usize)
    }

    /// Непосредственный родитель вида.
    pub fn parent(
        &self,
        kind: KindId,
    ) -> Option<KindId> {
        self.node(kind)
            .and_then(|n| n.parent)
            .map(|index| self.id_at(index))
    }

    /// `true`, если `ancestor` совпадает с `kind` или лежит на пути от него к
    /// корню. Для чужих видов всегда `false`.
    pub fn is_ancestor_or_self(
        &self,
        ancestor: KindId,
        kind: KindId,
    ) -> bool {
        match (self.node(ancestor), self.node(kind)) {
            (Some(a), Some(d)) => a.enter <= d.enter && d.exit <= a.exit,
            _ => false,
        }
    }

    /// Цепочка видов от `kind` (включительно) до корня.
    pub fn ancestors(
        &self,
        kind: KindId,
    ) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.contains(kind).then_some(kind),
        }
    }

    /// Все виды дерева в порядке объявления.
    pub fn iter(&self) -> impl Iterator<Item = KindId> + '_ {
        (0..self.nodes.len()).map(|index| self.id_at(index as u16))
    }

    fn node(
        &self,
        kind: KindId,
    ) -> Option<&KindNode> {
        if kind.tree != self.id {
            return None;
        }
        self.nodes.get(kind.index())
    }

    fn id_at(
        &self,
        index: u16,
    ) -> KindId {
        KindId {
            tree: self.id,
            index,
        }
    }
}

impl fmt::Debug for KindTree {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("KindTree")
            .field("id", &self.id)
            .field(
                "kinds",
                &self.nodes.iter().map(|n| &*n.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Итератор по предкам вида (от самого вида к корню).
pub struct Ancestors<'a> {
    tree: &'a KindTree,
    next: Option<KindId>,
}

impl Iterator for Ancestors<'_> {
    type Item = KindId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Построитель [`KindTree`].
///
/// Родитель всегда объявляется раньше потомка, поэтому циклы невозможны по
/// построению.
pub struct KindTreeBuilder {
    id: u32,
    names: Vec<Arc<str>>,
    parents: Vec<Option<u16>>,
    depths: Vec<u16>,
    by_name: FxHashMap<Arc<str>, u16>,
}

impl KindTreeBuilder {
    fn new(root: Arc<str>) -> Self {
        let mut by_name = FxHashMap::default();
        by_name.insert(root.clone(), 0);
        Self {
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
            names: vec![root],
            parents: vec![None],
            depths: vec![0],
            by_name,
        }
    }

    /// Корневой вид строящегося дерева.
    pub fn root(&self) -> KindId {
        KindId {
            tree: self.id,
            index: 0,
        }
    }

    /// Объявляет вид `name` как потомка `parent`.
    pub fn kind(
        &mut self,
        name: impl Into<Arc<str>>,
        parent: KindId,
    ) -> Result<KindId, KindTreeError> {
        let name = name.into();
        if parent.tree != self.id || parent.index() >= self.names.len() {
            return Err(KindTreeError::UnknownParent {
                name: name.to_string(),
                parent: format!("{parent:?}"),
            });
        }
        self.push(name, parent.index)
    }

    /// Объявляет вид `name` как потомка вида с именем `parent`.
    pub fn kind_under(
        &mut self,
        name: impl Into<Arc<str>>,
        parent: &str,
    ) -> Result<KindId, KindTreeError> {
        let name = name.into();
        let Some(&parent_index) = self.by_name.get(parent) else {
            return Err(KindTreeError::UnknownParent {
                name: name.to_string(),
                parent: parent.to_string(),
            });
        };
        self.push(name, parent_index)
    }

    /// Завершает построение: вычисляет интервалы обхода.
    pub fn build(self) -> Result<KindTree, KindTreeError> {
        if self.names[0].is_empty() {
            return Err(KindTreeError::EmptyName);
        }

        let count = self.names.len();
        let mut children: Vec<Vec<u16>> = vec![Vec::new(); count];
        for (index, parent) in self.parents.iter().enumerate() {
            if let Some(parent) = parent {
                children[*parent as usize].push(index as u16);
            }
        }

        let mut enter = vec![0u32; count];
        let mut exit = vec![0u32; count];
        let mut clock = 0u32;
        // (вершина, следующий ребёнок для посещения)
        let mut stack: Vec<(u16, usize)> = vec![(0, 0)];
        enter[0] = clock;
        while let Some(top) = stack.last_mut() {
            let (node, cursor) = *top;
            if let Some(&child) = children[node as usize].get(cursor) {
                top.1 += 1;
                clock += 1;
                enter[child as usize] = clock;
                stack.push((child, 0));
            } else {
                exit[node as usize] = clock;
                stack.pop();
            }
        }

        let nodes = self
            .names
            .into_iter()
            .enumerate()
            .map(|(index, name)| KindNode {
                name,
                parent: self.parents[index],
                depth: self.depths[index],
                enter: enter[index],
                exit: exit[index],
            })
            .collect();

        Ok(KindTree {
            id: self.id,
            nodes,
            by_name: self.by_name,
        })
    }

    fn push(
        &mut self,
        name: Arc<str>,
        parent: u16,
    ) -> Result<KindId, KindTreeError> {
        if name.is_empty() {
            return Err(KindTreeError::EmptyName);
        }
        if self.by_name.contains_key(&name) {
            return Err(KindTreeError::DuplicateKind {
                name: name.to_string(),
            });
        }
        if self.names.len() >= MAX_KINDS {
            return Err(KindTreeError::TooManyKinds { limit: MAX_KINDS });
        }

        let index = self.names.len() as u16;
        self.by_name.insert(name.clone(), index);
        self.names.push(name);
        self.parents.push(Some(parent));
        self.depths.push(self.depths[parent as usize] + 1);
        Ok(KindId {
            tree: self.id,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Дерево для тестов:
    ///
    /// ```text
    /// Message
    /// ├── Data
    /// │   ├── DataChanged
    /// │   │   └── NumericChanged
    /// │   └── DataRenamed
    /// └── Subset
    /// ```
    fn sample() -> (KindTree, [KindId; 6]) {
        let mut b = KindTree::builder("Message");
        let root = b.root();
        let data = b.kind("Data", root).unwrap();
        let changed = b.kind("DataChanged", data).unwrap();
        let numeric = b.kind("NumericChanged", changed).unwrap();
        let renamed = b.kind("DataRenamed", data).unwrap();
        let subset = b.kind_under("Subset", "Message").unwrap();
        let tree = b.build().unwrap();
        (tree, [root, data, changed, numeric, renamed, subset])
    }

    /// Тест проверяет глубину видов: у корня 0, каждый уровень +1.
    #[test]
    fn test_depths() {
        let (tree, [root, data, changed, numeric, renamed, subset]) = sample();
        assert_eq!(tree.depth(root), Some(0));
        assert_eq!(tree.depth(data), Some(1));
        assert_eq!(tree.depth(changed), Some(2));
        assert_eq!(tree.depth(numeric), Some(3));
        assert_eq!(tree.depth(renamed), Some(2));
        assert_eq!(tree.depth(subset), Some(1));
    }

    /// Тест проверяет отношение «предок или сам» в обе стороны.
    #[test]
    fn test_ancestor_or_self() {
        let (tree, [root, data, changed, numeric, renamed, subset]) = sample();
        assert!(tree.is_ancestor_or_self(root, numeric));
        assert!(tree.is_ancestor_or_self(data, numeric));
        assert!(tree.is_ancestor_or_self(changed, numeric));
        assert!(tree.is_ancestor_or_self(numeric, numeric));

        assert!(!tree.is_ancestor_or_self(numeric, changed));
        assert!(!tree.is_ancestor_or_self(renamed, numeric));
        assert!(!tree.is_ancestor_or_self(subset, data));
        assert!(!tree.is_ancestor_or_self(data, subset));
    }

    /// Тест проверяет, что цепочка предков идёт от вида к корню.
    #[test]
    fn test_ancestors_chain() {
        let (tree, [root, data, changed, numeric, ..]) = sample();
        let chain: Vec<_> = tree.ancestors(numeric).collect();
        assert_eq!(chain, vec![numeric, changed, data, root]);
        assert_eq!(tree.parent(root), None);
    }

    #[test]
    fn test_lookup_and_name() {
        let (tree, [_, data, ..]) = sample();
        assert_eq!(tree.lookup("Data"), Some(data));
        assert_eq!(tree.name(data), Some("Data"));
        assert_eq!(tree.lookup("Plot"), None);
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.iter().count(), 6);
    }

    /// Тест проверяет, что вид из другого дерева не распознаётся, даже если
    /// индекс совпадает.
    #[test]
    fn test_foreign_kind_is_not_recognized() {
        let (tree, [_, data, ..]) = sample();
        let (other, [_, other_data, ..]) = sample();
        assert_eq!(data.index(), other_data.index());
        assert!(tree.contains(data));
        assert!(!tree.contains(other_data));
        assert!(!other.contains(data));
        assert_eq!(tree.depth(other_data), None);
        assert!(!tree.is_ancestor_or_self(tree.root(), other_data));
        assert_eq!(tree.ancestors(other_data).count(), 0);
    }

    #[test]
    fn test_duplicate_kind_rejected() {
        let mut b = KindTree::builder("Message");
        let root = b.root();
        b.kind("Data", root).unwrap();
        assert_eq!(
            b.kind("Data", root),
            Err(KindTreeError::DuplicateKind {
                name: "Data".to_string()
            })
        );
        assert!(matches!(
            b.kind("Message", root),
            Err(KindTreeError::DuplicateKind { .. })
        ));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut b = KindTree::builder("Message");
        assert!(matches!(
            b.kind_under("SubsetUpdate", "Subset"),
            Err(KindTreeError::UnknownParent { .. })
        ));

        let foreign = KindTree::builder("Other").root();
        assert!(matches!(
            b.kind("Data", foreign),
            Err(KindTreeError::UnknownParent { .. })
        ));
    }

    #[test]
    fn test_empty_names_rejected() {
        let mut b = KindTree::builder("Message");
        let root = b.root();
        assert_eq!(b.kind("", root), Err(KindTreeError::EmptyName));
        assert!(matches!(
            KindTree::builder("").build(),
            Err(KindTreeError::EmptyName)
        ));
    }

    /// Тест проверяет дерево из одного корня.
    #[test]
    fn test_root_only_tree() {
        let tree = KindTree::builder("Message").build().unwrap();
        let root = tree.root();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_ancestor_or_self(root, root));
        assert_eq!(tree.depth(root), Some(0));
    }
}
