use env_loadr::{Env, Record, TagOptions, ValueMut, ValueRef};

#[derive(Env, Default)]
pub struct Attributes {
    /// Port to listen on
    ///
    /// Must be free.
    #[env("PORT", default = 8080)]
    pub port: u16,
    #[env = "HOST"]
    pub host: String,
    #[env]
    pub marked: bool,
    #[env(default = 1.5, doc = "Scaling factor")]
    pub ratio: f64,
    #[env(default = true)]
    pub enabled: bool,
    pub r#type: String,
    pub(crate) internal: String,
    private: String,
}

#[test]
fn test_field_defs() {
    let value = Attributes::default();
    let defs = value.field_defs();
    assert_eq!(defs.len(), 8);

    let port = &defs[0];
    assert_eq!(port.name, "port");
    assert_eq!(port.ty, "u16");
    assert!(port.exported);
    assert_eq!(port.tag("env"), Some("PORT"));
    assert_eq!(port.tag("default"), Some("8080"));
    assert_eq!(port.docs, "Port to listen on\n\nMust be free.");

    assert_eq!(defs[1].tag("env"), Some("HOST"));
    assert_eq!(defs[2].tag("env"), Some(""));
    assert_eq!(defs[3].tag("default"), Some("1.5"));
    assert_eq!(defs[3].tag("doc"), Some("Scaling factor"));
    assert_eq!(defs[4].tag("default"), Some("true"));
    assert_eq!(defs[5].name, "type");
    assert!(defs[6].exported);
    assert!(!defs[7].exported);
    assert_eq!(value.private, "");
}

#[test]
fn test_field_views() {
    let mut value = Attributes::default();
    assert!(value
        .fields()
        .iter()
        .all(|field| matches!(field.value, ValueRef::Leaf(_))));

    for field in value.fields_mut() {
        if field.def.name == "port" {
            if let ValueMut::Leaf(any) = field.value {
                *any.downcast_mut::<u16>().unwrap() = 1234;
            }
        }
    }
    assert_eq!(value.port, 1234);
    assert!(value.type_name().ends_with("Attributes"));
}

#[test]
fn test_tags_resolve_in_strict_mode() {
    let value = Attributes::default();
    let options = TagOptions::new().strict(true);

    let names: Vec<String> = value
        .field_defs()
        .iter()
        .map(|def| options.resolve_field(def, true).unwrap())
        .filter(|tag| !tag.should_ignore())
        .map(|tag| tag.name)
        .collect();
    assert_eq!(names, vec!["PORT", "HOST", "MARKED"]);
}

#[derive(Env, Default)]
pub struct Empty;

#[derive(Env, Default)]
pub struct Wrapper<T: Default + 'static> {
    pub inner: Option<T>,
}

#[test]
fn test_unit_and_generic_structs() {
    assert!(Empty.fields().is_empty());

    let wrapper = Wrapper::<u8>::default();
    assert_eq!(wrapper.field_defs()[0].ty, "Option<T>");
}
