//! 识别结果的结构化注释树
//!
//! 识别服务返回的 `fullTextAnnotation` 是一棵 页 → 块 → 段落 → 词 → 字符 的嵌套结构，
//! 每个节点可能带有 `confidence`。这里将其转换为只保留置信度与子集合的节点类型，
//! 转换过程是全函数：字段缺失、类型不符一律视为“没有”，不会失败。

use serde::Deserialize;
use serde_json::Value;

/// 子节点集合的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildRole {
    Pages,
    Blocks,
    Paragraphs,
    Words,
    Symbols,
}

impl ChildRole {
    pub const ALL: [ChildRole; 5] = [
        ChildRole::Pages,
        ChildRole::Blocks,
        ChildRole::Paragraphs,
        ChildRole::Words,
        ChildRole::Symbols,
    ];

    /// 该角色在服务返回 JSON 中的字段名
    pub fn field_name(self) -> &'static str {
        match self {
            ChildRole::Pages => "pages",
            ChildRole::Blocks => "blocks",
            ChildRole::Paragraphs => "paragraphs",
            ChildRole::Words => "words",
            ChildRole::Symbols => "symbols",
        }
    }
}

/// 注释树节点
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct AnnotationNode {
    confidence: Option<f64>,
    children: Vec<(ChildRole, Vec<AnnotationNode>)>,
}

impl AnnotationNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_children(mut self, role: ChildRole, nodes: Vec<AnnotationNode>) -> Self {
        match self.children.iter_mut().find(|(r, _)| *r == role) {
            Some((_, existing)) => existing.extend(nodes),
            None => self.children.push((role, nodes)),
        }
        self
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn children(&self, role: ChildRole) -> &[AnnotationNode] {
        self.children
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, nodes)| nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn child_collections(&self) -> impl Iterator<Item = (ChildRole, &[AnnotationNode])> {
        self.children
            .iter()
            .map(|(role, nodes)| (*role, nodes.as_slice()))
    }

    /// 从任意 JSON 构造节点；非对象返回 `None`
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let confidence = object.get("confidence").and_then(Value::as_f64);

        let children = ChildRole::ALL
            .iter()
            .filter_map(|role| {
                let items = object.get(role.field_name())?.as_array()?;
                let nodes: Vec<AnnotationNode> =
                    items.iter().filter_map(AnnotationNode::from_value).collect();
                Some((*role, nodes))
            })
            .collect();

        Some(Self {
            confidence,
            children,
        })
    }

    /// 深度优先（先序）遍历本节点及全部后代
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }
}

impl From<Value> for AnnotationNode {
    fn from(value: Value) -> Self {
        AnnotationNode::from_value(&value).unwrap_or_default()
    }
}

/// 先序遍历迭代器，使用显式栈，深层嵌套不会耗尽调用栈
pub struct Walk<'a> {
    stack: Vec<&'a AnnotationNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a AnnotationNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        for (_, nodes) in node.children.iter().rev() {
            self.stack.extend(nodes.iter().rev());
        }
        Some(node)
    }
}
