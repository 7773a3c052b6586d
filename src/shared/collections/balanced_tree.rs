//! BalancedTreeSet - 自顶向下红黑树（2-3-4树映射）
//!
//! 和标准有序集合的两个区别：
//! 1. **Upsert** - 插入一个比较器意义上"相等"的元素时，原地覆盖已存储的值
//!    （打包key只比较价格位，覆盖即更新数量）
//! 2. **缓存极值** - 每次插入/删除维护 min/max，最优价查询 O(1)
//!
//! 节点存放在 arena (`Vec<Node<T>>`) 里，用下标互相引用，没有父指针：
//! 插入时沿路径预先拆分4-node，删除时沿路径预先旋转保证不会从2-node删除，
//! 所以整个过程只需要记住 parent / grandparent 几个下标。
//!
//! 删除极值后，新的极值通过 O(log n) 的最左/最右遍历重新计算。

use super::KeyOrder;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;

type NodeId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    Black,
    Red,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rotation {
    Left,
    LeftRight,
    Right,
    RightLeft,
}

#[derive(Clone, Debug)]
struct Node<T> {
    item: T,
    left: Option<NodeId>,
    right: Option<NodeId>,
    color: Color,
}

/// 有序集合，元素按注入的比较器唯一
pub struct BalancedTreeSet<T, C> {
    /// 节点池
    nodes: Vec<Node<T>>,
    /// 已删除节点的槽位，供复用
    free: Vec<NodeId>,
    root: Option<NodeId>,
    count: usize,
    order: C,
    /// 缓存的最小元素（比较器意义）
    min: Option<T>,
    /// 缓存的最大元素
    max: Option<T>,
}

impl<T, C> BalancedTreeSet<T, C> {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 按比较器升序遍历
    pub fn iter(&self) -> Iter<'_, T, C> {
        Iter::new(self, false)
    }

    /// 按比较器降序遍历
    pub fn iter_rev(&self) -> Iter<'_, T, C> {
        Iter::new(self, true)
    }

    /// O(1) 最小元素
    #[inline]
    pub fn min(&self) -> Option<&T> {
        self.min.as_ref()
    }

    /// O(1) 最大元素
    #[inline]
    pub fn max(&self) -> Option<&T> {
        self.max.as_ref()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.count = 0;
        self.min = None;
        self.max = None;
    }
}

impl<T: Clone, C: KeyOrder<T>> BalancedTreeSet<T, C> {
    pub fn new(order: C) -> Self {
        Self::with_capacity(0, order)
    }

    /// 预分配节点池
    pub fn with_capacity(capacity: usize, order: C) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            root: None,
            count: 0,
            order,
            min: None,
            max: None,
        }
    }

    /// 查找与 `item` 相等的已存储元素
    pub fn get(&self, item: &T) -> Option<&T> {
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self.nodes[id];
            current = match self.order.compare(item, &node.item) {
                Ordering::Equal => return Some(&node.item),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        None
    }

    pub fn contains(&self, item: &T) -> bool {
        self.get(item).is_some()
    }

    /// 插入或覆盖
    ///
    /// # 返回
    /// - `true`: 新插入
    /// - `false`: 已存在相等元素，已被 `item` 覆盖
    pub fn insert(&mut self, item: T) -> bool {
        self.track_inserted(&item);

        let Some(root) = self.root else {
            let id = self.alloc(item, Color::Black);
            self.root = Some(id);
            self.count = 1;
            return true;
        };

        // 沿路径向下，遇到4-node就拆分，保证到达底部时父节点不是4-node
        let mut current = Some(root);
        let mut parent: Option<NodeId> = None;
        let mut grand_parent: Option<NodeId> = None;
        let mut great_grand_parent: Option<NodeId> = None;
        let mut order = Ordering::Equal;

        while let Some(cur) = current {
            order = self.order.compare(&item, &self.nodes[cur].item);
            if order == Ordering::Equal {
                // 拆分过程中根可能被染红
                self.paint_root_black();
                self.nodes[cur].item = item;
                return false;
            }

            if self.is_4node(cur) {
                self.split_4node(cur);
                // 拆分可能产生连续两个红节点，旋转修复
                if self.is_red(parent) {
                    self.insertion_balance(cur, &mut parent, grand_parent, great_grand_parent);
                }
            }

            great_grand_parent = grand_parent;
            grand_parent = parent;
            parent = Some(cur);
            current = if order == Ordering::Less {
                self.nodes[cur].left
            } else {
                self.nodes[cur].right
            };
        }

        let parent_id = parent.expect("non-empty tree always yields an insertion parent");
        let node = self.alloc(item, Color::Red);
        if order == Ordering::Greater {
            self.nodes[parent_id].right = Some(node);
        } else {
            self.nodes[parent_id].left = Some(node);
        }

        if self.nodes[parent_id].color == Color::Red {
            self.insertion_balance(node, &mut parent, grand_parent, great_grand_parent);
        }

        self.paint_root_black();
        self.count += 1;
        true
    }

    /// 删除与 `item` 相等的元素，不存在时返回 false
    pub fn remove(&mut self, item: &T) -> bool {
        let Some(root) = self.root else {
            return false;
        };

        // 找到匹配节点后继续向右子树的最左端走，找到后继；
        // 沿途保证当前节点不是2-node，最后用后继替换匹配节点。
        let mut current = Some(root);
        let mut parent: Option<NodeId> = None;
        let mut grand_parent: Option<NodeId> = None;
        let mut matched: Option<NodeId> = None;
        let mut parent_of_match: Option<NodeId> = None;
        let mut found = false;

        while let Some(cur) = current {
            if self.is_2node(cur) {
                match parent {
                    // 根：直接染红
                    None => self.nodes[cur].color = Color::Red,
                    Some(p) => {
                        let mut sibling = self.sibling(p, cur);
                        if self.nodes[sibling].color == Color::Red {
                            // 父节点是3-node，单旋转翻转红链方向，转化成下面的情况
                            if self.nodes[p].right == Some(sibling) {
                                self.rotate_left(p);
                            } else {
                                self.rotate_right(p);
                            }

                            self.nodes[p].color = Color::Red;
                            self.nodes[sibling].color = Color::Black;
                            self.replace_child_or_root(grand_parent, p, Some(sibling));
                            grand_parent = Some(sibling);
                            if matched == Some(p) {
                                parent_of_match = Some(sibling);
                            }

                            sibling = self.sibling(p, cur);
                        }

                        if self.is_2node(sibling) {
                            self.merge_2nodes(p);
                        } else {
                            // 兄弟是3-node或4-node：借一个key过来
                            let rotation = self.rotation_for(p, cur, sibling);
                            let new_grand_parent = self.rotate(p, rotation);

                            let parent_color = self.nodes[p].color;
                            self.nodes[new_grand_parent].color = parent_color;
                            self.nodes[p].color = Color::Black;
                            self.nodes[cur].color = Color::Red;

                            self.replace_child_or_root(grand_parent, p, Some(new_grand_parent));
                            if matched == Some(p) {
                                parent_of_match = Some(new_grand_parent);
                            }
                        }
                    }
                }
            }

            // 找到匹配后不再比较，一路向左走到后继
            let order = if found {
                Ordering::Less
            } else {
                self.order.compare(item, &self.nodes[cur].item)
            };
            if order == Ordering::Equal {
                found = true;
                matched = Some(cur);
                parent_of_match = parent;
            }

            grand_parent = parent;
            parent = Some(cur);
            current = if order == Ordering::Less {
                self.nodes[cur].left
            } else {
                self.nodes[cur].right
            };
        }

        if let Some(matched) = matched {
            let successor = parent.expect("search path contains the matched node");
            self.replace_node(matched, parent_of_match, successor, grand_parent);
            self.free.push(matched);
            self.count -= 1;
            self.track_removed(item);
        }

        self.paint_root_black();
        found
    }

    fn track_inserted(&mut self, item: &T) {
        // 相等也替换：缓存值要带上最新数量
        let replace_min = match &self.min {
            None => true,
            Some(min) => self.order.compare(item, min) != Ordering::Greater,
        };
        if replace_min {
            self.min = Some(item.clone());
        }

        let replace_max = match &self.max {
            None => true,
            Some(max) => self.order.compare(item, max) != Ordering::Less,
        };
        if replace_max {
            self.max = Some(item.clone());
        }
    }

    fn track_removed(&mut self, item: &T) {
        let removed_min = self
            .min
            .as_ref()
            .is_some_and(|min| self.order.compare(item, min) == Ordering::Equal);
        if removed_min {
            self.min = self.edge(false);
        }

        let removed_max = self
            .max
            .as_ref()
            .is_some_and(|max| self.order.compare(item, max) == Ordering::Equal);
        if removed_max {
            self.max = self.edge(true);
        }
    }

    /// 最左（或最右）节点的值，O(log n)
    fn edge(&self, rightmost: bool) -> Option<T> {
        let mut current = self.root?;
        loop {
            let node = &self.nodes[current];
            let next = if rightmost { node.right } else { node.left };
            match next {
                Some(id) => current = id,
                None => return Some(node.item.clone()),
            }
        }
    }

    fn alloc(&mut self, item: T, color: Color) -> NodeId {
        let node = Node {
            item,
            left: None,
            right: None,
            color,
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    // ------------------------------------------------------------------
    // 颜色 / 形状判断
    // ------------------------------------------------------------------

    #[inline]
    fn is_red(&self, id: Option<NodeId>) -> bool {
        matches!(id, Some(id) if self.nodes[id].color == Color::Red)
    }

    #[inline]
    fn is_2node(&self, id: NodeId) -> bool {
        let node = &self.nodes[id];
        node.color == Color::Black && !self.is_red(node.left) && !self.is_red(node.right)
    }

    #[inline]
    fn is_4node(&self, id: NodeId) -> bool {
        let node = &self.nodes[id];
        self.is_red(node.left) && self.is_red(node.right)
    }

    #[inline]
    fn paint_root_black(&mut self) {
        if let Some(root) = self.root {
            self.nodes[root].color = Color::Black;
        }
    }

    #[inline]
    fn left_of(&self, id: NodeId) -> NodeId {
        self.nodes[id].left.expect("rotation requires a left child")
    }

    #[inline]
    fn right_of(&self, id: NodeId) -> NodeId {
        self.nodes[id].right.expect("rotation requires a right child")
    }

    fn sibling(&self, parent: NodeId, node: NodeId) -> NodeId {
        let parent = &self.nodes[parent];
        let sibling = if parent.left == Some(node) {
            parent.right
        } else {
            parent.left
        };
        sibling.expect("a non-root 2-node always has a sibling")
    }

    fn split_4node(&mut self, id: NodeId) {
        let left = self.left_of(id);
        let right = self.right_of(id);
        self.nodes[id].color = Color::Red;
        self.nodes[left].color = Color::Black;
        self.nodes[right].color = Color::Black;
    }

    /// 两个2-node合并成一个4-node
    fn merge_2nodes(&mut self, id: NodeId) {
        let left = self.left_of(id);
        let right = self.right_of(id);
        self.nodes[id].color = Color::Black;
        self.nodes[left].color = Color::Red;
        self.nodes[right].color = Color::Red;
    }

    fn replace_child_or_root(&mut self, parent: Option<NodeId>, child: NodeId, new_child: Option<NodeId>) {
        match parent {
            Some(p) => {
                if self.nodes[p].left == Some(child) {
                    self.nodes[p].left = new_child;
                } else {
                    self.nodes[p].right = new_child;
                }
            }
            None => self.root = new_child,
        }
    }

    /// 用后继替换匹配节点；没有后继时用匹配节点的左孩子
    fn replace_node(
        &mut self,
        matched: NodeId,
        parent_of_match: Option<NodeId>,
        successor: NodeId,
        parent_of_successor: Option<NodeId>,
    ) {
        let replacement = if successor == matched {
            // 匹配节点没有右孩子
            self.nodes[matched].left
        } else {
            if let Some(right) = self.nodes[successor].right {
                self.nodes[right].color = Color::Black;
            }

            if parent_of_successor != Some(matched) {
                let parent = parent_of_successor.expect("successor below the match has a parent");
                self.nodes[parent].left = self.nodes[successor].right;
                self.nodes[successor].right = self.nodes[matched].right;
            }

            self.nodes[successor].left = self.nodes[matched].left;
            Some(successor)
        };

        if let Some(replacement) = replacement {
            let color = self.nodes[matched].color;
            self.nodes[replacement].color = color;
        }

        self.replace_child_or_root(parent_of_match, matched, replacement);
    }

    /// 插入时修复连续红节点。双旋转后 `current` 成为 `great_grand_parent` 的孩子。
    fn insertion_balance(
        &mut self,
        current: NodeId,
        parent: &mut Option<NodeId>,
        grand_parent: Option<NodeId>,
        great_grand_parent: Option<NodeId>,
    ) {
        let parent_id = parent.expect("insertion balance needs a parent");
        let grand_parent = grand_parent.expect("a red parent is never the root");

        let parent_is_on_right = self.nodes[grand_parent].right == Some(parent_id);
        let current_is_on_right = self.nodes[parent_id].right == Some(current);

        let new_child = if parent_is_on_right == current_is_on_right {
            if current_is_on_right {
                self.rotate_left(grand_parent)
            } else {
                self.rotate_right(grand_parent)
            }
        } else {
            let new_child = if current_is_on_right {
                self.rotate_left_right(grand_parent)
            } else {
                self.rotate_right_left(grand_parent)
            };
            *parent = great_grand_parent;
            new_child
        };

        self.nodes[grand_parent].color = Color::Red;
        self.nodes[new_child].color = Color::Black;
        self.replace_child_or_root(great_grand_parent, grand_parent, Some(new_child));
    }

    /// 删除时，`current` 是2-node而兄弟不是，选择借key的旋转方式
    fn rotation_for(&self, parent: NodeId, current: NodeId, sibling: NodeId) -> Rotation {
        let current_is_left = self.nodes[parent].left == Some(current);
        if self.is_red(self.nodes[sibling].left) {
            if current_is_left {
                Rotation::RightLeft
            } else {
                Rotation::Right
            }
        } else if current_is_left {
            Rotation::Left
        } else {
            Rotation::LeftRight
        }
    }

    // ------------------------------------------------------------------
    // 旋转：返回新的子树根，调用方负责把它挂回父节点
    // ------------------------------------------------------------------

    fn rotate(&mut self, id: NodeId, rotation: Rotation) -> NodeId {
        match rotation {
            Rotation::Right => {
                let red = self.left_of(self.left_of(id));
                self.nodes[red].color = Color::Black;
                self.rotate_right(id)
            }
            Rotation::Left => {
                let red = self.right_of(self.right_of(id));
                self.nodes[red].color = Color::Black;
                self.rotate_left(id)
            }
            Rotation::RightLeft => self.rotate_right_left(id),
            Rotation::LeftRight => self.rotate_left_right(id),
        }
    }

    fn rotate_left(&mut self, id: NodeId) -> NodeId {
        let child = self.right_of(id);
        self.nodes[id].right = self.nodes[child].left;
        self.nodes[child].left = Some(id);
        child
    }

    fn rotate_right(&mut self, id: NodeId) -> NodeId {
        let child = self.left_of(id);
        self.nodes[id].left = self.nodes[child].right;
        self.nodes[child].right = Some(id);
        child
    }

    fn rotate_left_right(&mut self, id: NodeId) -> NodeId {
        let child = self.left_of(id);
        let grand_child = self.right_of(child);

        self.nodes[id].left = self.nodes[grand_child].right;
        self.nodes[grand_child].right = Some(id);
        self.nodes[child].right = self.nodes[grand_child].left;
        self.nodes[grand_child].left = Some(child);
        grand_child
    }

    fn rotate_right_left(&mut self, id: NodeId) -> NodeId {
        let child = self.right_of(id);
        let grand_child = self.left_of(child);

        self.nodes[id].right = self.nodes[grand_child].left;
        self.nodes[grand_child].left = Some(id);
        self.nodes[child].left = self.nodes[grand_child].right;
        self.nodes[grand_child].right = Some(child);
        grand_child
    }

    /// 校验红黑树不变量，返回黑高（仅测试）
    #[cfg(test)]
    fn assert_invariants(&self) -> usize {
        fn walk<T: Clone, C: KeyOrder<T>>(tree: &BalancedTreeSet<T, C>, id: Option<NodeId>, seen: &mut usize) -> usize {
            let Some(id) = id else {
                return 1;
            };
            *seen += 1;
            let node = &tree.nodes[id];
            if node.color == Color::Red {
                assert!(!tree.is_red(node.left), "red node with red left child");
                assert!(!tree.is_red(node.right), "red node with red right child");
            }
            if let Some(left) = node.left {
                assert_eq!(tree.order.compare(&tree.nodes[left].item, &node.item), Ordering::Less);
            }
            if let Some(right) = node.right {
                assert_eq!(tree.order.compare(&tree.nodes[right].item, &node.item), Ordering::Greater);
            }
            let left_height = walk(tree, node.left, seen);
            let right_height = walk(tree, node.right, seen);
            assert_eq!(left_height, right_height, "black height mismatch");
            left_height + usize::from(node.color == Color::Black)
        }

        assert!(!self.is_red(self.root), "root must be black");
        let mut seen = 0;
        let height = walk(self, self.root, &mut seen);
        assert_eq!(seen, self.count);
        height
    }
}

impl<T: fmt::Debug, C> fmt::Debug for BalancedTreeSet<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, T, C> IntoIterator for &'a BalancedTreeSet<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// 显式栈的中序遍历。树高不超过 2*log2(n+1)，64 个槽位的内联栈基本不会溢出到堆上。
pub struct Iter<'a, T, C> {
    tree: &'a BalancedTreeSet<T, C>,
    stack: SmallVec<[NodeId; 64]>,
    reverse: bool,
    remaining: usize,
}

impl<'a, T, C> Iter<'a, T, C> {
    fn new(tree: &'a BalancedTreeSet<T, C>, reverse: bool) -> Self {
        let mut iter = Self {
            tree,
            stack: SmallVec::new(),
            reverse,
            remaining: tree.count,
        };
        iter.push_spine(tree.root);
        iter
    }

    fn push_spine(&mut self, mut node: Option<NodeId>) {
        let tree = self.tree;
        while let Some(id) = node {
            self.stack.push(id);
            let n = &tree.nodes[id];
            node = if self.reverse { n.right } else { n.left };
        }
    }
}

impl<'a, T, C> Iterator for Iter<'a, T, C> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let id = self.stack.pop()?;
        let tree = self.tree;
        let node = &tree.nodes[id];
        self.push_spine(if self.reverse { node.left } else { node.right });
        self.remaining -= 1;
        Some(&node.item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, C> ExactSizeIterator for Iter<'_, T, C> {}
