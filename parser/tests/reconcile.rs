use dt_form_parser::{
    compile_schema, CompilerConfig, DataStructure, DefaultChoice, NodeId, Placeholder,
    SchemaError,
};
use indoc::indoc;
use roxmltree::Document;

const ORDER: &str = indoc! {r#"
    <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns="urn:order" targetNamespace="urn:order">
        <xs:element name="order" type="orderType"/>
        <xs:complexType name="orderType">
            <xs:sequence>
                <xs:element name="customer" type="xs:string">
                    <xs:annotation>
                        <xs:appinfo><module>customer-picker</module></xs:appinfo>
                    </xs:annotation>
                </xs:element>
                <xs:element name="line" type="lineType" maxOccurs="unbounded"/>
                <xs:element name="note" type="xs:string" minOccurs="0"/>
                <xs:choice>
                    <xs:element name="email" type="xs:string"/>
                    <xs:element name="phone" type="xs:string"/>
                </xs:choice>
            </xs:sequence>
            <xs:attribute name="currency" default="EUR"/>
            <xs:attribute name="reference"/>
        </xs:complexType>
        <xs:complexType name="lineType">
            <xs:sequence>
                <xs:element name="product" type="xs:string"/>
                <xs:element name="quantity" type="xs:positiveInteger" default="1"/>
            </xs:sequence>
        </xs:complexType>
    </xs:schema>
"#};

fn compile(schema: &str, instance: Option<&str>, config: CompilerConfig) -> (DataStructure, NodeId) {
    let schema = Document::parse(schema).unwrap();
    match instance {
        Some(instance) => {
            let instance = Document::parse(instance).unwrap();
            compile_schema(&schema, config, None, Some(&instance)).unwrap()
        }
        None => compile_schema(&schema, config, None, None).unwrap(),
    }
}

fn node_at(tree: &DataStructure, root: NodeId, path: &str) -> NodeId {
    tree.find_by_path(root, path)
        .unwrap_or_else(|| panic!("no node at {path}"))
}

fn assert_round_trip(config: CompilerConfig) {
    let (fresh, fresh_root) = compile(ORDER, None, config.clone());
    let xml = fresh.to_xml(fresh_root).unwrap();

    // Only the global element is qualified
    let instance = Document::parse(&xml).unwrap();
    let order = instance.root_element();
    assert_eq!(order.tag_name().namespace(), Some("urn:order"));
    assert!(order
        .children()
        .filter(|c| c.is_element())
        .all(|c| c.tag_name().namespace().unwrap_or("").is_empty()));

    let (edited, edited_root) = compile(ORDER, Some(&xml), config);
    assert_eq!(
        edited.to_json(edited_root).unwrap(),
        fresh.to_json(fresh_root).unwrap(),
        "instance was:\n{xml}"
    );
}

#[test]
fn fresh_trees_survive_a_round_trip_through_xml() {
    assert_round_trip(CompilerConfig::default());
    assert_round_trip(CompilerConfig {
        default_choice: DefaultChoice::First,
        ..CompilerConfig::default()
    });
}

#[test]
fn repeated_elements_take_every_occurrence() {
    let instance = indoc! {r#"
        <order xmlns="urn:order" currency="USD">
            <customer>ACME</customer>
            <line><product>bolt</product><quantity>40</quantity></line>
            <line><product>nut</product><quantity>40</quantity></line>
            <line><product>washer</product></line>
            <phone>555-0100</phone>
        </order>
    "#};
    let (tree, root) = compile(ORDER, Some(instance), CompilerConfig::default());

    let products: Vec<_> = (1..=3)
        .map(|n| {
            let path = format!("/order[1]/line[{n}]/product[1]");
            tree.get(node_at(&tree, root, &path)).value.clone().unwrap()
        })
        .collect();
    assert_eq!(products, vec!["bolt", "nut", "washer"]);
    assert!(tree.find_by_path(root, "/order[1]/line[4]").is_none());

    // Missing required leaves are padded like fresh ones
    let quantity = node_at(&tree, root, "/order[1]/line[3]/quantity[1]");
    assert_eq!(tree.get(quantity).value.as_deref(), Some("1"));
    let quantity = node_at(&tree, root, "/order[1]/line[2]/quantity[1]");
    assert_eq!(tree.get(quantity).value.as_deref(), Some("40"));

    let currency = node_at(&tree, root, "/order[1]/@currency");
    assert_eq!(tree.get(currency).value.as_deref(), Some("USD"));
    let reference = node_at(&tree, root, "/order[1]/@reference");
    assert_eq!(tree.get(reference).value, None);

    let email = node_at(&tree, root, "/order[1]/email[1]");
    let phone = node_at(&tree, root, "/order[1]/phone[1]");
    assert_eq!(tree.get(email).is_selected(), Some(false));
    assert_eq!(tree.get(phone).is_selected(), Some(true));
    assert_eq!(tree.get(phone).value.as_deref(), Some("555-0100"));

    assert!(tree.find_by_path(root, "/order[1]/note[1]").is_none());
    assert!(tree
        .descendants(root)
        .iter()
        .all(|id| tree.get(*id).reload_error().is_none()));
}

#[test]
fn fresh_leaves_carry_defaults_and_module_keys() {
    let (tree, root) = compile(ORDER, None, CompilerConfig::default());

    let customer = tree.get(node_at(&tree, root, "/order[1]/customer[1]"));
    assert_eq!(customer.module(), Some("customer-picker"));
    let quantity = tree.get(node_at(&tree, root, "/order[1]/line[1]/quantity[1]"));
    assert_eq!(quantity.value.as_deref(), Some("1"));
    let currency = tree.get(node_at(&tree, root, "/order[1]/@currency"));
    assert_eq!(currency.value.as_deref(), Some("EUR"));
}

#[test]
fn incompatible_subtrees_are_flagged_and_siblings_still_reconcile() {
    let instance = indoc! {r#"
        <order xmlns="urn:order">
            <customer><name>ACME</name></customer>
            <line><product>bolt</product><colour>red</colour></line>
            <line><product>nut</product></line>
            <email>sales@example.com</email>
        </order>
    "#};
    let (tree, root) = compile(ORDER, Some(instance), CompilerConfig::default());

    let customer = tree.get(node_at(&tree, root, "/order[1]/customer[1]"));
    assert!(customer.reload_error().is_some());
    assert_eq!(customer.value, None);

    let first_line = tree.get(node_at(&tree, root, "/order[1]/line[1]"));
    assert!(first_line
        .reload_error()
        .is_some_and(|e| e.contains("<colour>")));

    let second_line = node_at(&tree, root, "/order[1]/line[2]");
    assert_eq!(tree.get(second_line).reload_error(), None);
    let product = node_at(&tree, root, "/order[1]/line[2]/product[1]");
    assert_eq!(tree.get(product).value.as_deref(), Some("nut"));

    let email = tree.get(node_at(&tree, root, "/order[1]/email[1]"));
    assert_eq!(email.value.as_deref(), Some("sales@example.com"));
    assert_eq!(tree.get(root).reload_error(), None);
}

#[test]
fn occurrences_beyond_max_are_kept_and_flagged() {
    let schema = indoc! {r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="pair">
                <xs:complexType>
                    <xs:sequence>
                        <xs:element name="member" maxOccurs="2"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:element>
        </xs:schema>
    "#};
    let instance = "<pair><member>a</member><member>b</member><member>c</member></pair>";
    let (tree, root) = compile(schema, Some(instance), CompilerConfig::default());

    let members = &tree.get(tree.get(root).children[0]).children;
    assert_eq!(members.len(), 3);
    assert_eq!(tree.get(members[1]).reload_error(), None);
    assert_eq!(tree.get(members[2]).value.as_deref(), Some("c"));
    assert_eq!(
        tree.get(members[2]).reload_error(),
        Some("occurrence 3 of <member> exceeds maxOccurs 2")
    );
}

#[test]
fn a_foreign_instance_root_is_flagged() {
    let (tree, root) = compile(ORDER, Some("<invoice/>"), CompilerConfig::default());
    assert_eq!(
        tree.get(root).reload_error(),
        Some("the instance root is <invoice>, expected <order>")
    );
}

const TREE: &str = indoc! {r#"
    <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:element name="node" type="nodeType"/>
        <xs:complexType name="nodeType">
            <xs:sequence>
                <xs:element name="label" type="xs:string"/>
                <xs:element name="node" type="nodeType" minOccurs="0" maxOccurs="unbounded"/>
            </xs:sequence>
        </xs:complexType>
    </xs:schema>
"#};

#[test]
fn required_self_reference_is_a_schema_error() {
    let schema = Document::parse(indoc! {r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="node" type="nodeType"/>
            <xs:complexType name="nodeType">
                <xs:sequence>
                    <xs:element name="node" type="nodeType"/>
                </xs:sequence>
            </xs:complexType>
        </xs:schema>
    "#})
    .unwrap();

    let err = compile_schema(&schema, CompilerConfig::default(), None, None).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        SchemaError::RecursiveDefinition { name } if name.contains("nodeType")
    ));
    assert_eq!(err.path(), Some("/node[1]/node[1]"));
}

#[test]
fn optional_self_reference_terminates() {
    let (tree, root) = compile(TREE, None, CompilerConfig::default());
    let sequence = tree.get(root).children[0];
    assert_eq!(tree.get(sequence).children.len(), 1);
}

#[test]
fn nested_instances_of_recursive_types_are_reconciled() {
    let instance = indoc! {"
        <node>
            <label>a</label>
            <node><label>b</label><node><label>c</label></node></node>
            <node><label>d</label></node>
        </node>
    "};
    let (tree, root) = compile(TREE, Some(instance), CompilerConfig::default());
    let deepest = node_at(&tree, root, "/node[1]/node[1]/node[1]/label[1]");
    assert_eq!(tree.get(deepest).value.as_deref(), Some("c"));
    let last = node_at(&tree, root, "/node[1]/node[2]/label[1]");
    assert_eq!(tree.get(last).value.as_deref(), Some("d"));
}

#[test]
fn depth_limit_stops_runaway_nesting() {
    let instance = "<node><label/><node><label/><node><label/></node></node></node>";
    let schema = Document::parse(TREE).unwrap();
    let instance = Document::parse(instance).unwrap();
    let config = CompilerConfig {
        max_depth: 4,
        ..CompilerConfig::default()
    };
    let err = compile_schema(&schema, config, None, Some(&instance)).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        SchemaError::DepthExceeded { limit: 4 }
    ));
}

#[test]
fn unresolved_types_are_schema_errors() {
    let schema = Document::parse(indoc! {r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="root">
                <xs:complexType>
                    <xs:sequence><xs:element name="a" type="missingType"/></xs:sequence>
                </xs:complexType>
            </xs:element>
        </xs:schema>
    "#})
    .unwrap();
    let err = compile_schema(&schema, CompilerConfig::default(), None, None).unwrap_err();
    assert!(matches!(err.root_cause(), SchemaError::Unresolved { kind: "type", .. }));
    assert_eq!(err.path(), Some("/root[1]"));
}

#[test]
fn template_placeholders_stand_in_for_optional_repetitions() {
    let template = CompilerConfig {
        placeholder: Placeholder::Template,
        ..CompilerConfig::default()
    };
    let (tree, root) = compile(TREE, None, template.clone());
    let sequence = tree.get(root).children[0];
    let children = &tree.get(sequence).children;
    let tags: Vec<_> = children.iter().map(|id| tree.get(*id).tag.as_str()).collect();
    assert_eq!(tags, vec!["label"]);

    let schema = indoc! {r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="tags">
                <xs:complexType>
                    <xs:sequence>
                        <xs:element name="tag" minOccurs="0" maxOccurs="unbounded"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:element>
        </xs:schema>
    "#};
    let (tree, root) = compile(schema, None, CompilerConfig::default());
    assert!(tree.get(tree.get(root).children[0]).children.is_empty());
    let (tree, root) = compile(schema, None, template);
    assert_eq!(tree.get(tree.get(root).children[0]).children.len(), 1);
}
