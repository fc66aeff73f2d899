//! Struct-to-class promotion.
//!
//! Every cataloged struct becomes a class with a public section holding its
//! fields, a default constructor and one declaration per associated method.
//! Method bodies are emitted out of line with the self parameter turned into
//! the implicit receiver.

use crate::catalog::{Catalog, MethodDef, StructDef};
use crate::edit::{apply_edits, Edit};
use crate::error::{Result, TranslateError};
use crate::scan;

/// Reject methods whose owner is not a cataloged struct.
pub fn validate(catalog: &Catalog) -> Result<()> {
    for method in catalog.methods() {
        if !catalog.structs.contains_key(&method.owner) {
            return Err(TranslateError::UnknownStruct {
                owner: method.owner.to_string(),
                method: method.name.to_string(),
            });
        }
    }
    Ok(())
}

/// Return type without storage and inlining specifiers, which have no
/// meaning on a member function.
fn member_return_type(return_type: &str) -> String {
    return_type
        .split_whitespace()
        .filter(|w| !matches!(*w, "static" | "inline"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn const_suffix(method: &MethodDef) -> &'static str {
    if method.self_const {
        " const"
    } else {
        ""
    }
}

/// The in-class declaration of a method, without indentation.
pub fn method_declaration(method: &MethodDef) -> String {
    format!(
        "{} {}({}){};",
        member_return_type(&method.return_type),
        method.name,
        method.params,
        const_suffix(method)
    )
}

/// The class declaration for one struct.
pub fn class_declaration(def: &StructDef, indent: &str, comments: bool) -> Vec<String> {
    let mut lines = Vec::new();
    if comments {
        lines.push(format!("// Class converted from struct {}", def.name));
    }
    lines.push(format!("class {} {{", def.name));
    lines.push("public:".to_string());
    for field in &def.fields {
        lines.push(format!("{}{};", indent, field));
    }

    lines.push(String::new());
    if comments {
        lines.push(format!("{}// Constructor", indent));
    }
    lines.push(format!("{}{}() {{}}", indent, def.name));

    if !def.methods.is_empty() {
        lines.push(String::new());
        if comments {
            lines.push(format!("{}// Methods", indent));
        }
        for method in &def.methods {
            lines.push(format!("{}{}", indent, method_declaration(method)));
        }
    }
    lines.push("};".to_string());

    if let Some(alias) = &def.alias {
        lines.push(format!("typedef {} {};", def.name, alias));
    }
    lines
}

/// The out-of-line definition `Ret Owner::name(params) { ... }`, with the
/// receiver rewritten.
pub fn method_definition(method: &MethodDef) -> String {
    format!(
        "{} {}::{}({}){} {{{}}}",
        member_return_type(&method.return_type),
        method.owner,
        method.name,
        method.params,
        const_suffix(method),
        rewrite_receiver(&method.body, &method.self_param)
    )
}

/// Turn uses of the self parameter into `this`.
///
/// `self->m`, `(*self).m` and `self.m` all become `this->m`; any other use of
/// the name becomes `this`. Member names that happen to equal the self
/// parameter are left alone.
pub fn rewrite_receiver(body: &str, self_name: &str) -> String {
    let masked = scan::mask_code(body);
    let bytes = masked.as_bytes();
    let mut edits = Vec::new();

    for id in scan::identifiers(&masked) {
        if !id.is_bare() || id.text(&masked) != self_name {
            continue;
        }
        let after = scan::next_non_ws(&masked, id.end);

        // (*self).m
        let before = masked[..id.start].trim_end();
        if let Some(star_prefix) = before.strip_suffix('*') {
            let paren_prefix = star_prefix.trim_end();
            if let (Some(open), Some((close, b')'))) = (paren_prefix.strip_suffix('('), after) {
                if let Some((dot, b'.')) = scan::next_non_ws(&masked, close + 1) {
                    edits.push(Edit::new(open.len(), dot + 1, "this->"));
                    continue;
                }
            }
        }

        match after {
            Some((dot, b'.')) if !bytes.get(dot + 1).is_some_and(u8::is_ascii_digit) => {
                edits.push(Edit::new(id.start, dot + 1, "this->"));
            }
            _ => edits.push(Edit::new(id.start, id.end, "this")),
        }
    }

    apply_edits(body, edits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::SmolStr;

    const GEOMETRY: &str = r#"
typedef struct vec_s {
    double x;
    double y;
} Vec2;

struct Counter {
    int value;
    int step;
};

static inline double length(const Vec2 *self) {
    return sqrt(self->x * self->x + (*self).y * self->y);
}

void bump(struct Counter *c, int times) {
    c->value += c->step * times;
}

int main(void) { return 0; }
"#;

    #[test]
    fn test_class_declaration() {
        let catalog = Catalog::build(GEOMETRY);
        let lines = class_declaration(&catalog.structs["Counter"], "    ", true);
        insta::assert_snapshot!(lines.join("\n"), @r"
        // Class converted from struct Counter
        class Counter {
        public:
            int value;
            int step;

            // Constructor
            Counter() {}

            // Methods
            void bump(int times);
        };
        ");
    }

    #[test]
    fn test_class_declaration_with_alias_and_const_method() {
        let catalog = Catalog::build(GEOMETRY);
        let lines = class_declaration(&catalog.structs["vec_s"], "  ", false);
        assert_eq!(
            lines,
            vec![
                "class vec_s {",
                "public:",
                "  double x;",
                "  double y;",
                "",
                "  vec_s() {}",
                "",
                "  double length() const;",
                "};",
                "typedef vec_s Vec2;",
            ]
        );
    }

    #[test]
    fn test_method_definition() {
        let catalog = Catalog::build(GEOMETRY);
        let bump = &catalog.structs["Counter"].methods[0];
        assert_eq!(
            method_definition(bump),
            "void Counter::bump(int times) {\n    this->value += this->step * times;\n}"
        );

        let length = &catalog.structs["vec_s"].methods[0];
        assert!(method_definition(length).starts_with("double vec_s::length() const {"));
        assert!(method_definition(length)
            .contains("sqrt(this->x * this->x + this->y * this->y)"));
    }

    #[test]
    fn test_rewrite_receiver_forms() {
        assert_eq!(rewrite_receiver("p->x = p.y;", "p"), "this->x = this->y;");
        assert_eq!(rewrite_receiver("( * p ).x++;", "p"), "this->x++;");
        assert_eq!(rewrite_receiver("reset(p); return *p;", "p"), "reset(this); return *this;");
    }

    #[test]
    fn test_rewrite_receiver_leaves_members_and_literals() {
        assert_eq!(
            rewrite_receiver("q->p = 1; puts(\"p\"); // p\n", "p"),
            "q->p = 1; puts(\"p\"); // p\n"
        );
        assert_eq!(rewrite_receiver("pp = p2;", "p"), "pp = p2;");
    }

    #[test]
    fn test_validate_rejects_unknown_owner() {
        let mut catalog = Catalog::build(GEOMETRY);
        assert!(validate(&catalog).is_ok());

        let counter = catalog.structs.get_mut("Counter").expect("Counter");
        counter.methods[0].owner = SmolStr::new("Ghost");
        assert_eq!(
            validate(&catalog),
            Err(TranslateError::UnknownStruct {
                owner: "Ghost".into(),
                method: "bump".into(),
            })
        );
    }
}
