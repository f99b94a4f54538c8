//! 置信度聚合
//!
//! 对注释树中所有带置信度的节点（根节点与每一层后代）取算术平均，
//! 各层节点权重相同。

use ocr_conn::AnnotationNode;

/// 计算注释树的平均置信度；树不存在或没有任何置信度时返回 0
pub fn aggregate(tree: Option<&AnnotationNode>) -> f64 {
    let Some(root) = tree else {
        return 0.0;
    };

    let (sum, count) = root
        .walk()
        .filter_map(AnnotationNode::confidence)
        .fold((0.0_f64, 0_usize), |(sum, count), value| (sum + value, count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// 保留两位小数
pub fn round_confidence(confidence: f64) -> f64 {
    (confidence * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocr_conn::ChildRole;
    use serde_json::json;

    fn node(confidence: f64) -> AnnotationNode {
        AnnotationNode::new().with_confidence(confidence)
    }

    #[test]
    fn test_absent_tree_is_zero() {
        assert_eq!(aggregate(None), 0.0);
    }

    #[test]
    fn test_tree_without_confidence_is_zero() {
        let tree = AnnotationNode::new().with_children(
            ChildRole::Pages,
            vec![AnnotationNode::new().with_children(ChildRole::Blocks, vec![AnnotationNode::new()])],
        );
        assert_eq!(aggregate(Some(&tree)), 0.0);
    }

    #[test]
    fn test_mean_over_root_and_children() {
        let tree = node(0.9).with_children(ChildRole::Pages, vec![node(0.8), node(1.0)]);
        assert!((aggregate(Some(&tree)) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_shape_does_not_change_the_mean() {
        let flat = AnnotationNode::new().with_children(
            ChildRole::Symbols,
            vec![node(0.9), node(0.8), node(1.0)],
        );
        let deep = node(1.0).with_children(
            ChildRole::Pages,
            vec![node(0.8).with_children(
                ChildRole::Blocks,
                vec![AnnotationNode::new().with_children(
                    ChildRole::Paragraphs,
                    vec![AnnotationNode::new()
                        .with_children(ChildRole::Words, vec![node(0.9)])],
                )],
            )],
        );

        let a = aggregate(Some(&flat));
        let b = aggregate(Some(&deep));
        assert!((a - b).abs() < 1e-9);
        assert!((a - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_parent_and_leaf_weigh_the_same() {
        // 一个页节点 0.5，下挂四个字符 1.0：(0.5 + 4 * 1.0) / 5
        let tree = AnnotationNode::new().with_children(
            ChildRole::Pages,
            vec![node(0.5).with_children(
                ChildRole::Symbols,
                vec![node(1.0), node(1.0), node(1.0), node(1.0)],
            )],
        );
        assert!((aggregate(Some(&tree)) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_non_numeric_confidence_is_skipped() {
        let tree = AnnotationNode::from_value(&json!({
            "pages": [
                {"confidence": "high"},
                {"confidence": 0.6},
                {"confidence": null, "blocks": "not a list"}
            ]
        }))
        .unwrap();
        assert!((aggregate(Some(&tree)) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_is_repeatable() {
        let tree = node(0.33).with_children(ChildRole::Words, vec![node(0.71), node(0.12)]);
        let first = aggregate(Some(&tree));
        let second = aggregate(Some(&tree));
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_round_confidence() {
        assert_eq!(round_confidence(0.98765), 0.99);
        assert_eq!(round_confidence(0.904), 0.9);
        assert_eq!(round_confidence(0.0), 0.0);
        assert_eq!(round_confidence(1.0), 1.0);
    }
}
