//! Integration tests for the mapping generation pipeline.
//!
//! Each test builds a synthetic Go module in memory, loads the YAML
//! documents and checks the generated file text.

use std::path::Path;
use structmap_codegen::{
    load_conversions, CodegenError, Config, Generator, ResolveError, TypeKey,
};
use structmap_core::{FileSystemProvider, GoEnv, InMemoryProvider, ModuleLoader};

fn module() -> InMemoryProvider {
    InMemoryProvider::default().with_file("/m/go.mod", "module example.com/app\n\ngo 1.22\n")
}

fn env() -> GoEnv {
    GoEnv::new("linux", "amd64")
        .with_mod_cache("/cache")
        .with_goroot("/goroot")
}

fn generator(provider: InMemoryProvider, config: &str, conversions: &str) -> Generator {
    let config = Config::from_yaml(config).expect("valid config");
    let conversions = load_conversions(conversions).expect("valid conversions");
    let loader = ModuleLoader::discover_with(provider, Path::new("/m"), env()).expect("go.mod");
    Generator::new(config, conversions, Box::new(loader))
}

fn generate(provider: InMemoryProvider, config: &str, conversions: &str) -> String {
    generator(provider, config, conversions)
        .generate()
        .expect("generation succeeds")
}

const USER_CONFIG: &str = r#"
out_package_name: mappers
mappings:
  - from:
      type: "{{ .Import0 }}.User"
      imports: ["example.com/app/models"]
    to:
      type: "{{ .Import0 }}.UserDTO"
      imports: ["example.com/app/dto"]
"#;

fn user_module(user: &str, dto: &str) -> InMemoryProvider {
    module()
        .with_file("/m/models/user.go", format!("package models\n\n{}\n", user))
        .with_file("/m/dto/user.go", format!("package dto\n\n{}\n", dto))
}

#[test]
fn drops_extra_source_fields_without_comments() {
    let provider = user_module(
        "type User struct {\n\tID   string\n\tName string\n\tAge  int\n}",
        "type UserDTO struct {\n\tID   string\n\tName string\n}",
    );
    let out = generate(provider, USER_CONFIG, "");
    assert_eq!(
        out,
        "// Code generated by structmap; DO NOT EDIT.
package mappers

import (
\tref1 \"example.com/app/models\"
\tref2 \"example.com/app/dto\"
)

// MapUserToUserDTO copies User → UserDTO
func MapUserToUserDTO(src ref1.User) (dst ref2.UserDTO) {
\tdst.ID = src.ID
\tdst.Name = src.Name
\treturn
}
"
    );
}

#[test]
fn pointer_conversion_rule_is_applied() {
    let provider = user_module(
        "type User struct{ Count int }",
        "type UserDTO struct{ Count *int }",
    );
    let conversions = r#"
conversions:
  - source_type: int
    dest_type: "*int"
    conversion:
      tmpl: "{{ .Dest }} = &{{ .Source }}"
"#;
    let out = generate(provider, USER_CONFIG, conversions);
    assert!(out.contains("\tdst.Count = &src.Count\n"), "{out}");
    assert!(!out.contains("err error"));
}

#[test]
fn output_is_byte_identical_across_runs() {
    let provider = user_module(
        "import \"time\"\n\ntype User struct {\n\tID string `json:\"id\"`\n\tAt time.Time\n}",
        "import \"time\"\n\ntype UserDTO struct {\n\tIdent string `json:\"id\"`\n\tAt time.Time\n\tExtra int\n}",
    );
    let first = generate(provider.clone(), USER_CONFIG, "");
    let second = generate(provider.clone(), USER_CONFIG, "");
    assert_eq!(first, second);

    let mut gen = generator(provider, USER_CONFIG, "");
    let again = gen.generate().unwrap();
    assert_eq!(gen.generate().unwrap(), again);
    assert_eq!(again, first);
}

#[test]
fn name_override_wins_over_tag_override_and_same_name() {
    let provider = user_module(
        "type User struct {\n\tName string\n\tFullName string\n\tAlias string `json:\"alias\"`\n}",
        "type UserDTO struct {\n\tName string `json:\"name\"`\n}",
    );
    let config = r#"
out_package_name: mappers
mappings:
  - from: {type: "{{ .Import0 }}.User", imports: [example.com/app/models]}
    to: {type: "{{ .Import0 }}.UserDTO", imports: [example.com/app/dto]}
    custom_field_mappings:
      - dest_field: Name
        source_field: FullName
      - dest_tag: name
        source_tag: alias
"#;
    let out = generate(provider, config, "");
    assert!(out.contains("\tdst.Name = src.FullName\n"), "{out}");
}

#[test]
fn earlier_tag_override_wins_over_later_name_override() {
    let provider = user_module(
        "type User struct {\n\tName string\n\tFullName string\n\tAlias string `json:\"alias\"`\n}",
        "type UserDTO struct {\n\tName string `json:\"name\"`\n}",
    );
    let config = r#"
out_package_name: mappers
mappings:
  - from: {type: "{{ .Import0 }}.User", imports: [example.com/app/models]}
    to: {type: "{{ .Import0 }}.UserDTO", imports: [example.com/app/dto]}
    custom_field_mappings:
      - dest_tag: name
        source_tag: alias
      - dest_field: Name
        source_field: FullName
"#;
    let out = generate(provider, config, "");
    assert!(out.contains("\tdst.Name = src.Alias\n"), "{out}");
}

#[test]
fn later_source_field_wins_a_tag_tie() {
    let provider = user_module(
        "type User struct {\n\tFirst string `json:\"id\"`\n\tSecond string `json:\"id,omitempty\"`\n}",
        "type UserDTO struct {\n\tIdent string `json:\"id\"`\n}",
    );
    let out = generate(provider, USER_CONFIG, "");
    assert!(out.contains("\tdst.Ident = src.Second\n"), "{out}");
}

#[test]
fn custom_tag_key_is_used_for_matching() {
    let provider = user_module(
        "type User struct {\n\tHeight int `db:\"height\"`\n}",
        "type UserDTO struct {\n\tTall int `db:\"height\" json:\"tall\"`\n}",
    );
    let config = format!("{}    tag: db\n", USER_CONFIG);
    let out = generate(provider, &config, "");
    assert!(out.contains("\tdst.Tall = src.Height\n"), "{out}");
}

#[test]
fn embedded_fields_are_flattened_two_levels_deep() {
    let provider = module()
        .with_file(
            "/m/models/order.go",
            "package models\n\ntype Base struct {\n\tID string\n}\n\ntype Audit struct {\n\tBase\n\tCreatedBy string\n}\n\ntype Order struct {\n\t*Audit\n\tTotal int\n}\n",
        )
        .with_file(
            "/m/dto/order.go",
            "package dto\n\ntype OrderDTO struct {\n\tID        string\n\tCreatedBy string\n\tTotal     int\n}\n",
        );
    let config = r#"
out_package_name: mappers
mappings:
  - from: {type: "{{ .Import0 }}.Order", imports: [example.com/app/models]}
    to: {type: "{{ .Import0 }}.OrderDTO", imports: [example.com/app/dto]}
"#;
    let out = generate(provider, config, "");
    assert!(out.contains(
        "\tdst.ID = src.ID\n\tdst.CreatedBy = src.CreatedBy\n\tdst.Total = src.Total\n\treturn\n"
    ));
    assert!(!out.contains("no matching source"));
}

#[test]
fn alias_cycle_across_modules_is_an_error() {
    let provider = module()
        .with_file(
            "/m/a/a.go",
            "package a\n\nimport \"example.com/app/b\"\n\ntype A = b.B\n",
        )
        .with_file(
            "/m/b/b.go",
            "package b\n\nimport \"example.com/app/a\"\n\ntype B = a.A\n",
        );
    let config = r#"
out_package_name: mappers
mappings:
  - from: {type: "{{ .Import0 }}.A", imports: [example.com/app/a]}
    to: {type: "{{ .Import0 }}.B", imports: [example.com/app/b]}
"#;
    let err = generator(provider, config, "").generate().unwrap_err();
    match &err {
        CodegenError::Resolve {
            context,
            source: ResolveError::Circular { chain },
        } => {
            assert_eq!(context, "mapping 0 (A -> B)");
            assert!(chain.starts_with("example.com/app/a.A"));
        }
        other => panic!("expected a circular reference error, got {other}"),
    }
    assert!(err.to_string().contains("circular type reference"));
}

#[test]
fn local_conversion_beats_global_conversion() {
    let provider = user_module(
        "type User struct{ Count int }",
        "type UserDTO struct{ Count *int }",
    );
    let config = r#"
out_package_name: mappers
mappings:
  - from: {type: "{{ .Import0 }}.User", imports: [example.com/app/models]}
    to: {type: "{{ .Import0 }}.UserDTO", imports: [example.com/app/dto]}
    custom_conversions:
      - source_type: int
        dest_type: "*int"
        conversion:
          tmpl: "{{ .Dest }} = &{{ .Source }}"
"#;
    let conversions = r#"
conversions:
  - source_type: int
    dest_type: "*int"
    conversion:
      tmpl: "{{ .Dest }} = globalPtr({{ .Source }})"
"#;
    let out = generate(provider, config, conversions);
    assert!(out.contains("\tdst.Count = &src.Count\n"), "{out}");
    assert!(!out.contains("globalPtr"));
}

#[test]
fn forward_only_rule_in_reverse_is_a_bare_assignment() {
    let provider = user_module(
        "type User struct{ Count int }",
        "type UserDTO struct{ Count *int }",
    );
    let conversions = r#"
conversions:
  - source_type: "*int"
    dest_type: int
    conversion:
      tmpl: "{{ .Dest }} = *{{ .Source }}"
"#;
    let out = generate(provider, USER_CONFIG, conversions);
    assert!(out.contains("\tdst.Count = src.Count\n"), "{out}");
}

#[test]
fn fallible_reverse_conversion_adds_error_result() {
    let provider = module()
        .with_file(
            "/m/vendor/github.com/google/uuid/uuid.go",
            "package uuid\n\ntype UUID [16]byte\n",
        )
        .with_file(
            "/m/models/user.go",
            "package models\n\ntype User struct {\n\tID string\n}\n",
        )
        .with_file(
            "/m/dto/user.go",
            "package dto\n\nimport \"github.com/google/uuid\"\n\ntype UserDTO struct {\n\tID uuid.UUID\n}\n",
        );
    let conversions = r#"
conversions:
  - source_type: "{{ .Import0 }}.UUID"
    dest_type: string
    imports: [github.com/google/uuid]
    conversion:
      tmpl: "{{ .Dest }} = {{ .Source }}.String()"
    reverse_conversion:
      tmpl: |-
        {{ .Dest }}, {{ .Error }} = {{ .Import0 }}.Parse({{ .Source }})
        if {{ .Error }} != nil {
        	return
        }
      error: true
"#;
    let out = generate(provider, USER_CONFIG, conversions);
    assert!(
        out.contains("func MapUserToUserDTO(src ref2.User) (dst ref3.UserDTO, err error) {\n"),
        "{out}"
    );
    assert!(out.contains(
        "\tdst.ID, err = ref1.Parse(src.ID)\n\tif err != nil {\n\t\treturn\n\t}\n\treturn\n}"
    ));
    assert!(out.contains("\tref1 \"github.com/google/uuid\"\n"));
}

#[test]
fn only_referenced_imports_are_emitted() {
    let provider = user_module(
        "type User struct{ N int }",
        "type UserDTO struct{ N string }",
    );
    let conversions = r#"
conversions:
  - source_type: int
    dest_type: string
    imports: [example.com/app/convert]
    conversion:
      tmpl: "{{ .Dest }} = {{ .Import0 }}.Itoa({{ .Source }})"
  - source_type: "{{ .Import0 }}.A"
    dest_type: "{{ .Import1 }}.B"
    imports:
      - example.com/unused/p0
      - example.com/unused/p1
      - example.com/unused/p2
      - example.com/unused/p3
      - example.com/unused/p4
      - example.com/unused/p5
      - example.com/unused/p6
    conversion:
      tmpl: "{{ .Dest }} = {{ .Source }}"
"#;
    let mut gen = generator(provider, USER_CONFIG, conversions);
    let out = gen.generate().unwrap();
    assert_eq!(gen.imports().bindings().len(), 10);
    assert!(out.contains(
        "import (\n\tref1 \"example.com/app/convert\"\n\tref9 \"example.com/app/models\"\n\tref10 \"example.com/app/dto\"\n)\n"
    ), "{out}");
    assert!(out.contains("\tdst.N = ref1.Itoa(src.N)\n"));
}

#[test]
fn unmapped_field_becomes_a_comment_and_args_are_injected() {
    let provider = user_module(
        "type User struct{ ID string }",
        "import \"time\"\n\ntype UserDTO struct {\n\tID string\n\tCreatedAt time.Time\n\tNotes string\n}",
    );
    let config = r#"
out_package_name: mappers
mappings:
  - from: {type: "{{ .Import0 }}.User", imports: [example.com/app/models]}
    to: {type: "{{ .Import0 }}.UserDTO", imports: [example.com/app/dto]}
    func_name: ToDTO
    func_additional_args:
      - name: now
        dest_field: CreatedAt
        type: "{{ .Import0 }}.Time"
        imports: [time]
"#;
    let out = generate(provider, config, "");
    assert!(out.contains("// ToDTO copies User → UserDTO\n"));
    assert!(out.contains("func ToDTO(src ref1.User, now time.Time) (dst ref2.UserDTO) {\n"));
    assert!(out.contains("\tdst.CreatedAt = now\n"));
    assert!(out.contains(
        "\t// no matching source found for field: Notes, consider adding an additional arg or aligning the fields\n"
    ));
    assert!(out.contains("import (\n\t\"time\"\n\tref1 "));
}

#[test]
fn several_mappings_share_one_file() {
    let provider = user_module(
        "type User struct{ ID string }",
        "type UserDTO struct{ ID string }",
    );
    let config = r#"
out_package_name: mappers
mappings:
  - from: {type: "{{ .Import0 }}.User", imports: [example.com/app/models]}
    to: {type: "{{ .Import0 }}.UserDTO", imports: [example.com/app/dto]}
  - from: {type: "{{ .Import0 }}.UserDTO", imports: [example.com/app/dto]}
    to: {type: "{{ .Import0 }}.User", imports: [example.com/app/models]}
"#;
    let out = generate(provider, config, "");
    let first = out.find("func MapUserToUserDTO").unwrap();
    let second = out.find("func MapUserDTOToUser").unwrap();
    assert!(first < second);
    assert!(out.contains("\treturn\n}\n\n// MapUserDTOToUser copies UserDTO → User\n"));
}

#[test]
fn embeds_structs_from_required_modules() {
    let provider = InMemoryProvider::default()
        .with_file(
            "/m/go.mod",
            "module example.com/app\n\ngo 1.22\n\nrequire gorm.io/gorm v1.25.0\n",
        )
        .with_file(
            "/cache/gorm.io/gorm@v1.25.0/model.go",
            "package gorm\n\nimport \"time\"\n\ntype Model struct {\n\tID        uint\n\tCreatedAt time.Time\n}\n",
        )
        .with_file(
            "/m/models/user.go",
            "package models\n\nimport \"gorm.io/gorm\"\n\ntype User struct {\n\tgorm.Model\n\tName string\n}\n",
        )
        .with_file(
            "/m/models/gen.go",
            "//go:build ignore\n\n// Command gen seeds fixtures.\npackage main\n\ntype Seed struct{}\n",
        )
        .with_file(
            "/m/dto/user.go",
            "package dto\n\nimport \"time\"\n\ntype UserDTO struct {\n\tID        uint\n\tName      string\n\tCreatedAt time.Time\n}\n",
        );
    let out = generate(provider, USER_CONFIG, "");
    assert!(
        out.contains("\tdst.ID = src.ID\n\tdst.Name = src.Name\n\tdst.CreatedAt = src.CreatedAt\n"),
        "{out}"
    );
    assert!(!out.contains("gorm.io/gorm"), "{out}");
}

#[test]
fn missing_type_reports_mapping_context() {
    let provider = user_module("type User struct{ ID string }", "type Other struct{}");
    let err = generator(provider, USER_CONFIG, "").generate().unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("mapping 0 (User -> UserDTO): "), "{message}");
    assert!(message.contains("UserDTO not found"));
}

#[test]
fn inspect_lists_flattened_fields() {
    let provider = module().with_file(
        "/m/models/user.go",
        "package models\n\ntype Base struct{ ID string `json:\"id\"` }\ntype User struct {\n\tBase\n\tName string\n}\n",
    );
    let loader = ModuleLoader::discover_with(provider, Path::new("/m"), env()).unwrap();
    let fields = structmap_codegen::inspect(
        Box::new(loader),
        &TypeKey::new("example.com/app/models", "User"),
    )
    .unwrap();
    let json = serde_json::to_value(&fields).unwrap();
    assert_eq!(json[0]["name"], "ID");
    assert_eq!(json[0]["tag"], "json:\"id\"");
    assert_eq!(json[0]["type"]["type"], "string");
    assert_eq!(json[1]["name"], "Name");
}

#[test]
fn generates_from_a_module_on_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = dir.path();
    std::fs::write(root.join("go.mod"), "module example.com/app\n").unwrap();
    std::fs::create_dir_all(root.join("models")).unwrap();
    std::fs::create_dir_all(root.join("dto")).unwrap();
    std::fs::write(
        root.join("models/user.go"),
        "package models\n\ntype User struct {\n\tID string\n}\n",
    )
    .unwrap();
    std::fs::write(
        root.join("dto/user.go"),
        "package dto\n\ntype UserDTO struct {\n\tID string\n}\n",
    )
    .unwrap();

    let loader = ModuleLoader::discover(FileSystemProvider, root).unwrap();
    let config = Config::from_yaml(USER_CONFIG).unwrap();
    let out = Generator::new(config, vec![], Box::new(loader))
        .generate()
        .unwrap();
    assert!(out.contains("\tdst.ID = src.ID\n"));
}
