//! End-to-end bundling scenarios over real files on disk.

mod common;

use common::{SpecTree, component_names, parse, refs};
use serde_yaml::Value;
use stitch::BundleError;
use stitch::index::{IndexError, Position};

const INFO: &str = "info:\n  title: pets\n  version: '1'\n";

fn root(body: &str) -> String {
    format!("openapi: 3.1.0\n{INFO}{body}")
}

// ---------------------------------------------------------------------------
// Compose mode
// ---------------------------------------------------------------------------

#[test]
fn shared_target_is_lifted_once() {
    let tree = SpecTree::new("openapi.yaml")
        .file(
            "openapi.yaml",
            &root("paths: {}\ncomponents:\n  schemas:\n    A:\n      $ref: './a.yaml#/A'\n    B:\n      $ref: './b.yaml#/B'\n"),
        )
        .file("a.yaml", "A:\n  type: object\n  properties:\n    c:\n      $ref: './c.yaml#/C'\n")
        .file("b.yaml", "B:\n  type: object\n  properties:\n    c:\n      $ref: './c.yaml#/C'\n")
        .file("c.yaml", "C:\n  type: string\n");

    let out = tree.compose().unwrap();
    let bundled = parse(&out.bytes);
    assert_eq!(
        component_names(&bundled, "schemas"),
        vec!["A", "B", "A__a", "B__b", "C"]
    );
    let schemas = &bundled["components"]["schemas"];
    assert_eq!(schemas["A"]["$ref"], Value::from("#/components/schemas/A__a"));
    assert_eq!(schemas["A__a"]["properties"]["c"]["$ref"], Value::from("#/components/schemas/C"));
    assert_eq!(schemas["B__b"]["properties"]["c"]["$ref"], Value::from("#/components/schemas/C"));
    assert_eq!(out.origins.len(), 3);
}

#[test]
fn root_names_win_collisions() {
    let tree = SpecTree::new("openapi.yaml")
        .file(
            "openapi.yaml",
            &root(
                "paths:\n  /pets:\n    get:\n      responses:\n        '200':\n          description: ok\n          content:\n            application/json:\n              schema:\n                $ref: './b.yaml#/Pet'\ncomponents:\n  schemas:\n    Pet:\n      type: object\n      description: local\n",
            ),
        )
        .file("b.yaml", "Pet:\n  type: object\n  description: external\n");

    let out = tree.compose().unwrap();
    let bundled = parse(&out.bytes);
    let schemas = &bundled["components"]["schemas"];
    assert_eq!(schemas["Pet"]["description"], Value::from("local"));
    assert_eq!(schemas["Pet__b"]["description"], Value::from("external"));
    assert_eq!(
        bundled["paths"]["/pets"]["get"]["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
        Value::from("#/components/schemas/Pet__b")
    );

    let origin = &out.origins["#/components/schemas/Pet__b"];
    assert!(origin.was_renamed);
    assert_eq!(origin.original_name, "Pet");
    assert_eq!(origin.original_ref, "#/Pet");
    assert_eq!((origin.line, origin.column), (1, 1));
    assert!(origin.original_file.ends_with("b.yaml"));
}

#[test]
fn discriminator_mapping_targets_are_lifted() {
    let tree = SpecTree::new("openapi.yaml")
        .file(
            "openapi.yaml",
            &root(
                "paths: {}\ncomponents:\n  schemas:\n    Pet:\n      oneOf:\n        - $ref: './cat.yaml#/Cat'\n      discriminator:\n        propertyName: kind\n        mapping:\n          cat: './cat.yaml#/Cat'\n          dog: './dog.yaml#/Dog'\n          bird: Bird\n",
            ),
        )
        .file("cat.yaml", "Cat:\n  type: object\n")
        .file("dog.yaml", "Dog:\n  type: object\n  properties:\n    owner:\n      $ref: './owner.yaml#/Owner'\n")
        .file("owner.yaml", "Owner:\n  type: object\n");

    let out = tree.compose().unwrap();
    let bundled = parse(&out.bytes);
    assert_eq!(
        component_names(&bundled, "schemas"),
        vec!["Pet", "Cat", "Dog", "Owner"]
    );
    let mapping = &bundled["components"]["schemas"]["Pet"]["discriminator"]["mapping"];
    assert_eq!(mapping["cat"], Value::from("#/components/schemas/Cat"));
    assert_eq!(mapping["dog"], Value::from("#/components/schemas/Dog"));
    assert_eq!(mapping["bird"], Value::from("Bird"));
    assert_eq!(
        bundled["components"]["schemas"]["Dog"]["properties"]["owner"]["$ref"],
        Value::from("#/components/schemas/Owner")
    );
}

#[test]
fn whole_file_mapping_target_is_named_after_file() {
    let tree = SpecTree::new("openapi.yaml")
        .file(
            "openapi.yaml",
            &root(
                "paths: {}\ncomponents:\n  schemas:\n    Pet:\n      type: object\n      discriminator:\n        propertyName: kind\n        mapping:\n          dog: './dog.yaml'\n",
            ),
        )
        .file("dog.yaml", "type: object\nproperties:\n  bark:\n    type: boolean\n");

    let out = tree.compose().unwrap();
    let bundled = parse(&out.bytes);
    assert_eq!(component_names(&bundled, "schemas"), vec!["Pet", "dog"]);
    let schemas = &bundled["components"]["schemas"];
    assert_eq!(
        schemas["Pet"]["discriminator"]["mapping"]["dog"],
        Value::from("#/components/schemas/dog")
    );
    assert_eq!(schemas["dog"]["properties"]["bark"]["type"], Value::from("boolean"));

    let origin = &out.origins["#/components/schemas/dog"];
    assert_eq!(origin.original_name, "dog");
    assert!(!origin.was_renamed);
}

#[test]
fn unresolved_mapping_is_reported_not_fatal() {
    let tree = SpecTree::new("openapi.yaml").file(
        "openapi.yaml",
        &root(
            "paths: {}\ncomponents:\n  schemas:\n    Pet:\n      type: object\n      discriminator:\n        propertyName: kind\n        mapping:\n          ghost: './ghost.yaml#/Ghost'\n",
        ),
    );
    let out = tree.compose().unwrap();
    assert_eq!(out.report.unresolved_mappings.len(), 1);
    assert_eq!(out.report.unresolved_mappings[0].tag, "ghost");
    let bundled = parse(&out.bytes);
    assert_eq!(
        bundled["components"]["schemas"]["Pet"]["discriminator"]["mapping"]["ghost"],
        Value::from("./ghost.yaml#/Ghost")
    );
}

#[test]
fn cross_file_cycle_is_composed() {
    let tree = SpecTree::new("openapi.yaml")
        .file(
            "openapi.yaml",
            &root("paths: {}\ncomponents:\n  schemas:\n    Entry:\n      $ref: './a.yaml#/A'\n"),
        )
        .file("a.yaml", "A:\n  type: object\n  properties:\n    b:\n      $ref: './b.yaml#/B'\n")
        .file("b.yaml", "B:\n  type: object\n  properties:\n    a:\n      $ref: './a.yaml#/A'\n");

    let out = tree.compose().unwrap();
    let bundled = parse(&out.bytes);
    let schemas = &bundled["components"]["schemas"];
    assert_eq!(schemas["Entry"]["$ref"], Value::from("#/components/schemas/A"));
    assert_eq!(schemas["A"]["properties"]["b"]["$ref"], Value::from("#/components/schemas/B"));
    assert_eq!(schemas["B"]["properties"]["a"]["$ref"], Value::from("#/components/schemas/A"));
}

#[test]
fn whole_file_import_is_named_after_file() {
    let tree = SpecTree::new("openapi.yaml")
        .file(
            "openapi.yaml",
            &root("paths: {}\ncomponents:\n  schemas:\n    Wrapper:\n      properties:\n        pet:\n          $ref: './models/pet.yaml'\n"),
        )
        .file("models/pet.yaml", "type: object\nproperties:\n  name:\n    type: string\n");

    let out = tree.compose().unwrap();
    let bundled = parse(&out.bytes);
    assert_eq!(
        bundled["components"]["schemas"]["Wrapper"]["properties"]["pet"]["$ref"],
        Value::from("#/components/schemas/pet")
    );
    let origin = &out.origins["#/components/schemas/pet"];
    assert_eq!(origin.original_ref, "#");
    assert!(!origin.was_renamed);
}

#[test]
fn typed_components_keep_their_category() {
    let tree = SpecTree::new("openapi.yaml")
        .file(
            "openapi.yaml",
            &root(
                "paths:\n  /pets:\n    get:\n      parameters:\n        - $ref: './common.yaml#/components/parameters/Limit'\n      responses:\n        '200':\n          $ref: './common.yaml#/components/responses/Ok'\n",
            ),
        )
        .file(
            "common.yaml",
            "components:\n  parameters:\n    Limit:\n      name: limit\n      in: query\n  responses:\n    Ok:\n      description: ok\n",
        );

    let out = tree.compose().unwrap();
    let bundled = parse(&out.bytes);
    let get = &bundled["paths"]["/pets"]["get"];
    assert_eq!(get["parameters"][0]["$ref"], Value::from("#/components/parameters/Limit"));
    assert_eq!(get["responses"]["200"]["$ref"], Value::from("#/components/responses/Ok"));
    assert_eq!(bundled["components"]["parameters"]["Limit"]["in"], Value::from("query"));
}

#[test]
fn slash_in_name_is_escaped() {
    let tree = SpecTree::new("openapi.yaml")
        .file(
            "openapi.yaml",
            &root("paths: {}\ncomponents:\n  schemas:\n    Wrapper:\n      items:\n        $ref: './ext.yaml#/components/schemas/Foo~1Bar'\n"),
        )
        .file("ext.yaml", "components:\n  schemas:\n    Foo/Bar:\n      type: object\n");

    let out = tree.compose().unwrap();
    let bundled = parse(&out.bytes);
    assert_eq!(
        bundled["components"]["schemas"]["Wrapper"]["items"]["$ref"],
        Value::from("#/components/schemas/Foo~1Bar")
    );
    assert!(bundled["components"]["schemas"]["Foo/Bar"].is_mapping());
}

#[test]
fn root_local_cycle_terminates() {
    let source = root(
        "paths: {}\ncomponents:\n  schemas:\n    Node:\n      type: object\n      properties:\n        next:\n          $ref: '#/components/schemas/Node'\n",
    );
    let tree = SpecTree::new("openapi.yaml").file("openapi.yaml", &source);

    let expected = parse(source.as_bytes());
    assert_eq!(parse(&tree.compose().unwrap().bytes), expected);
    let inlined = tree.inline().unwrap();
    assert_eq!(parse(&inlined.bytes), expected);
    assert_eq!(inlined.report.circular_skips.len(), 1);
}

#[test]
fn json_root_renders_json() {
    let tree = SpecTree::new("openapi.json")
        .file(
            "openapi.json",
            r##"{"openapi": "3.1.0", "paths": {}, "components": {"schemas": {"Pet": {"$ref": "./pet.json#/Pet"}}}}"##,
        )
        .file("pet.json", r#"{"Pet": {"type": "object"}}"#);

    let out = tree.compose().unwrap();
    assert_eq!(out.bytes.first(), Some(&b'{'));
    let bundled: serde_json::Value = serde_json::from_slice(&out.bytes).unwrap();
    assert_eq!(bundled["components"]["schemas"]["Pet"]["$ref"], "#/components/schemas/Pet__pet");
    assert_eq!(bundled["components"]["schemas"]["Pet__pet"]["type"], "object");
}

#[test]
fn vendor_extensions_are_opaque() {
    let tree = SpecTree::new("openapi.yaml").file(
        "openapi.yaml",
        &root("paths: {}\nx-generator:\n  $ref: './does-not-exist.yaml'\n"),
    );
    let out = tree.compose().unwrap();
    let bundled = parse(&out.bytes);
    assert_eq!(bundled["x-generator"]["$ref"], Value::from("./does-not-exist.yaml"));
}

#[test]
fn external_urls_are_left_alone() {
    let tree = SpecTree::new("openapi.yaml").file(
        "openapi.yaml",
        &root("paths: {}\ncomponents:\n  schemas:\n    Remote:\n      $ref: 'https://example.com/schemas/pet.yaml#/Pet'\n"),
    );
    let out = tree.compose().unwrap();
    let bundled = parse(&out.bytes);
    assert_eq!(
        bundled["components"]["schemas"]["Remote"]["$ref"],
        Value::from("https://example.com/schemas/pet.yaml#/Pet")
    );
}

// ---------------------------------------------------------------------------
// Inline mode
// ---------------------------------------------------------------------------

#[test]
fn inline_copies_targets_and_keeps_cycles() {
    let tree = SpecTree::new("openapi.yaml")
        .file(
            "openapi.yaml",
            &root(
                "paths: {}\ncomponents:\n  schemas:\n    Pet:\n      $ref: './pet.yaml#/Pet'\n    Loop:\n      $ref: './a.yaml#/A'\n",
            ),
        )
        .file("pet.yaml", "Pet:\n  type: object\n  properties:\n    tag:\n      $ref: './tag.yaml'\n")
        .file("tag.yaml", "type: string\n")
        .file("a.yaml", "A:\n  properties:\n    self:\n      $ref: '#/A'\n");

    let out = tree.inline().unwrap();
    let bundled = parse(&out.bytes);
    let schemas = &bundled["components"]["schemas"];
    assert_eq!(schemas["Pet"]["properties"]["tag"]["type"], Value::from("string"));
    assert_eq!(schemas["Loop"]["$ref"], Value::from("./a.yaml#/A"));
    assert_eq!(out.report.circular_skips.len(), 1);
    assert!(out.origins.is_empty());
}

#[test]
fn inline_lifts_mapping_targets() {
    let tree = SpecTree::new("openapi.yaml")
        .file(
            "openapi.yaml",
            &root(
                "paths: {}\ncomponents:\n  schemas:\n    Pet:\n      oneOf:\n        - $ref: './cat.yaml#/Cat'\n        - $ref: './dog.yaml'\n      discriminator:\n        propertyName: kind\n        mapping:\n          cat: './cat.yaml#/Cat'\n          dog: './dog.yaml'\n",
            ),
        )
        .file("cat.yaml", "Cat:\n  type: object\n  properties:\n    toy:\n      $ref: './toy.yaml#/Toy'\n")
        .file("toy.yaml", "Toy:\n  type: string\n")
        .file("dog.yaml", "type: object\n");

    let out = tree.inline().unwrap();
    let bundled = parse(&out.bytes);
    assert_eq!(component_names(&bundled, "schemas"), vec!["Pet", "Cat", "dog"]);

    let schemas = &bundled["components"]["schemas"];
    let pet = &schemas["Pet"];
    assert_eq!(pet["discriminator"]["mapping"]["cat"], Value::from("#/components/schemas/Cat"));
    assert_eq!(pet["discriminator"]["mapping"]["dog"], Value::from("#/components/schemas/dog"));
    assert_eq!(pet["oneOf"][0]["$ref"], Value::from("#/components/schemas/Cat"));
    assert_eq!(pet["oneOf"][1]["$ref"], Value::from("#/components/schemas/dog"));
    assert_eq!(schemas["Cat"]["properties"]["toy"]["type"], Value::from("string"));

    let text = String::from_utf8(out.bytes).unwrap();
    assert!(!text.contains(".yaml"), "{text}");
    assert!(refs(&bundled).iter().all(|r| r.starts_with("#/")));
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn missing_file_is_hard_error_with_position() {
    let tree = SpecTree::new("openapi.yaml").file(
        "openapi.yaml",
        &root("paths: {}\ncomponents:\n  schemas:\n    Pet:\n      $ref: './missing.yaml#/Pet'\n"),
    );
    for result in [tree.compose(), tree.inline()] {
        match result.unwrap_err() {
            BundleError::UnresolvedReference {
                pointer,
                position,
                source,
                ..
            } => {
                assert_eq!(pointer, "./missing.yaml#/Pet");
                assert_eq!(position, Some(Position { line: 9, column: 7 }));
                assert!(matches!(
                    source,
                    IndexError::FileNotFound { .. } | IndexError::FileUnavailable { .. }
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn strict_mode_rejects_siblings_before_31() {
    let source = "openapi: 3.0.3\npaths: {}\ncomponents:\n  schemas:\n    Pet:\n      type: object\n    Owner:\n      $ref: '#/components/schemas/Pet'\n      description: owner\n";
    let tree = SpecTree::new("openapi.yaml").file("openapi.yaml", source);
    let mut config = tree.config();
    config.composition.strict_validation = true;

    let err = stitch::Bundler::new(config.clone())
        .compose(&tree.root_bytes())
        .unwrap_err();
    assert_eq!(err.position(), Some(Position { line: 8, column: 7 }));
    assert!(err.to_string().contains("description"), "{err}");

    // Same document declared as 3.1: allowed, sibling preserved.
    let tree = SpecTree::new("openapi.yaml").file("openapi.yaml", &source.replace("3.0.3", "3.1.0"));
    config.source = tree.config().source;
    let out = stitch::Bundler::new(config).compose(&tree.root_bytes()).unwrap();
    let bundled = parse(&out.bytes);
    let owner = &bundled["components"]["schemas"]["Owner"];
    assert_eq!(owner["$ref"], Value::from("#/components/schemas/Pet"));
    assert_eq!(owner["description"], Value::from("owner"));
}

#[test]
fn non_strict_allows_siblings_in_30() {
    let tree = SpecTree::new("openapi.yaml").file(
        "openapi.yaml",
        "openapi: 3.0.3\npaths: {}\ncomponents:\n  schemas:\n    Pet:\n      type: object\n    Owner:\n      $ref: '#/components/schemas/Pet'\n      description: owner\n",
    );
    assert!(tree.compose().is_ok());
}

#[test]
fn strict_mode_checks_only_reached_files() {
    // `sub/a.yaml` points at its neighbour `sub/common.yaml`; the root-level
    // `common.yaml` is never reached, so its sibling keys do not count.
    let tree = SpecTree::new("openapi.yaml")
        .file(
            "openapi.yaml",
            &format!("openapi: 3.0.3\n{INFO}paths: {{}}\ncomponents:\n  schemas:\n    A:\n      $ref: './sub/a.yaml#/A'\n"),
        )
        .file("sub/a.yaml", "A:\n  type: object\n  properties:\n    c:\n      $ref: './common.yaml#/C'\n")
        .file("sub/common.yaml", "C:\n  type: string\n")
        .file("common.yaml", "C:\n  $ref: '#/D'\n  description: unrelated\nD:\n  type: string\n");
    let mut config = tree.config();
    config.composition.strict_validation = true;

    let out = stitch::Bundler::new(config).compose(&tree.root_bytes()).unwrap();
    let bundled = parse(&out.bytes);
    let schemas = &bundled["components"]["schemas"];
    assert_eq!(schemas["A__a"]["properties"]["c"]["$ref"], Value::from("#/components/schemas/C"));
    assert_eq!(schemas["C"]["type"], Value::from("string"));
}

#[test]
fn non_mapping_components_section_is_rejected() {
    let tree = SpecTree::new("openapi.yaml")
        .file(
            "openapi.yaml",
            &root(
                "paths:\n  /pets:\n    get:\n      responses:\n        '200':\n          description: ok\n          content:\n            application/json:\n              schema:\n                $ref: './pet.yaml#/Pet'\ncomponents:\n  schemas: []\n",
            ),
        )
        .file("pet.yaml", "Pet:\n  type: object\n");

    let err = tree.compose().unwrap_err();
    assert!(matches!(err, BundleError::InvalidInput { .. }), "{err}");
    assert!(err.to_string().contains("components.schemas"), "{err}");
}

// ---------------------------------------------------------------------------
// Output properties
// ---------------------------------------------------------------------------

fn multi_file_tree() -> SpecTree {
    SpecTree::new("specs/openapi.yaml")
        .file(
            "specs/openapi.yaml",
            &root(
                "paths:\n  /pets:\n    get:\n      responses:\n        '200':\n          $ref: './responses/ok.yaml'\ncomponents:\n  schemas:\n    Pet:\n      type: object\n    Owner:\n      $ref: './models/owner.yaml#/Owner'\n",
            ),
        )
        .file(
            "specs/responses/ok.yaml",
            "description: ok\ncontent:\n  application/json:\n    schema:\n      $ref: '../models/pet.yaml#/Pet'\n",
        )
        .file(
            "specs/models/pet.yaml",
            "Pet:\n  type: object\n  properties:\n    owner:\n      $ref: './owner.yaml#/Owner'\n",
        )
        .file(
            "specs/models/owner.yaml",
            "Owner:\n  type: object\n  properties:\n    pets:\n      type: array\n      items:\n        $ref: './pet.yaml#/Pet'\n",
        )
}

#[test]
fn no_file_paths_survive_compose() {
    let tree = multi_file_tree();
    let out = tree.compose().unwrap();
    let bundled = parse(&out.bytes);
    let all = refs(&bundled);
    assert!(!all.is_empty());
    assert!(all.iter().all(|r| r.starts_with("#/")), "{all:?}");
    assert_eq!(
        component_names(&bundled, "schemas"),
        vec!["Pet", "Owner", "Owner__owner", "Pet__pet"]
    );
    assert_eq!(component_names(&bundled, "responses"), vec!["ok"]);
}

#[test]
fn compose_is_deterministic() {
    let tree = multi_file_tree();
    let first = tree.compose().unwrap();
    let second = tree.compose().unwrap();
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(first.origins, second.origins);
}

#[test]
fn compose_is_idempotent() {
    let tree = multi_file_tree();
    let once = tree.compose().unwrap().bytes;

    let again = SpecTree::new("openapi.yaml").file(
        "openapi.yaml",
        std::str::from_utf8(&once).unwrap(),
    );
    let twice = again.compose().unwrap();
    assert_eq!(twice.bytes, once);
    assert!(twice.origins.is_empty());
}
