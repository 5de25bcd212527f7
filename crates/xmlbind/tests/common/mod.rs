// crates/xmlbind/tests/common/mod.rs

#![allow(dead_code)]

use xmlbind::tree::{self, Node};

/// Installs a test logger once per binary; `RUST_LOG=trace` shows matching
/// decisions.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Implements `XmlModel` for a type from a `ModelBindingBuilder` expression.
macro_rules! xml_model {
    ($ty:ty, $builder:expr) => {
        impl xmlbind::XmlModel for $ty {
            fn binding() -> &'static xmlbind::ModelBinding {
                static BINDING: std::sync::OnceLock<xmlbind::ModelBinding> =
                    std::sync::OnceLock::new();
                BINDING.get_or_init(|| $builder.build().expect("valid binding"))
            }
        }
    };
}

/// Drops what does not change the meaning of a document: namespace
/// declarations, attribute order and whitespace-only text.
fn normalize(mut node: Node) -> Node {
    node.nsmap = Default::default();
    node.attributes
        .sort_by(|a, b| (&a.ns, &a.name).cmp(&(&b.ns, &b.name)));
    node.text = node
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    node.children = node.children.into_iter().map(normalize).collect();
    node
}

/// Asserts two documents are equal once parsed and normalized.
pub fn assert_xml_equal(actual: impl AsRef<[u8]>, expected: impl AsRef<[u8]>) {
    let actual_bytes = actual.as_ref();
    let expected_bytes = expected.as_ref();
    let actual_tree = tree::parse(actual_bytes).expect("actual document parses");
    let expected_tree = tree::parse(expected_bytes).expect("expected document parses");
    assert_eq!(
        normalize(actual_tree),
        normalize(expected_tree),
        "\nactual:   {}\nexpected: {}",
        String::from_utf8_lossy(actual_bytes),
        String::from_utf8_lossy(expected_bytes)
    );
}
