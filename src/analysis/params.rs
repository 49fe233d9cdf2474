//! Parameter Descriptors
//!
//! Normalizes a command `<param>` or struct `<member>` into a canonical
//! descriptor: pointer depth, constness, length semantics, optionality and
//! direction. Rendering helpers are pure functions of the descriptor.
//!
//! Optionality is deliberately over-estimated. Registry authors have relaxed
//! pointers from required to optional after the fact, so every pointer is
//! treated as optional except a single handle pointer without a length and
//! string parameters.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::registry::{HandleKind, MemberNode};

/// Length token meaning "terminated by a NUL element"
pub const NULL_TERMINATED: &str = "null-terminated";

// =============================================================================
// Type lookups
// =============================================================================

/// Name sets the descriptor consults to classify element types
pub trait TypeLookup {
    fn is_struct(&self, name: &str) -> bool;
    fn handle_kind(&self, name: &str) -> Option<HandleKind>;
}

// =============================================================================
// Descriptor parts
// =============================================================================

/// Indirection level of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerKind {
    /// `T name`
    Value,
    /// `T* name`
    Single,
    /// `T** name`
    Double,
    /// `T* const* name`
    ConstPointerToPointer,
}

impl PointerKind {
    fn stars(self) -> &'static str {
        match self {
            Self::Value => "",
            Self::Single => "*",
            Self::Double => "**",
            Self::ConstPointerToPointer => "* const*",
        }
    }

    pub fn is_pointer(self) -> bool {
        self != Self::Value
    }
}

/// Where the element count of a pointer or array comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthSpec {
    /// Terminated by a NUL element
    NullTerminated,
    /// Another parameter/member, or an arrow path into one (`pInfo->count`)
    Named(String),
    /// Fixed bracket dimensions (`[4]`, `[VK_UUID_SIZE]`)
    Fixed(Vec<String>),
}

impl LengthSpec {
    /// The first length token, as it would appear in generated code
    pub fn token(&self) -> String {
        match self {
            Self::NullTerminated => NULL_TERMINATED.to_string(),
            Self::Named(name) => name.clone(),
            Self::Fixed(dims) => dims.join("]["),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

// =============================================================================
// Descriptor
// =============================================================================

/// Canonical description of one parameter or member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub type_name: String,
    pub pointer: PointerKind,
    /// Own `const` qualifier or inherited from a const context
    pub is_const: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<LengthSpec>,
    /// Bracket dimensions of a fixed array member
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub array_dims: Vec<String>,
    pub fixed_size: bool,
    pub optional: bool,
    pub is_string: bool,
    pub is_string_array: bool,
    pub is_struct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<HandleKind>,
    pub direction: Direction,
}

fn array_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\s*([A-Za-z0-9_]+)\s*\]").expect("valid array regex"))
}

/// Purely numeric or an all-uppercase symbolic constant
pub fn is_fixed_token(token: &str) -> bool {
    let token = token.trim();
    if token.is_empty() {
        return false;
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    token.chars().any(|c| c.is_ascii_uppercase())
        && token
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Rewrite `a::b` length paths into `a->b`
pub fn rewrite_length_path(path: &str) -> String {
    path.replace("::", "->")
}

/// Split a declaration into (prefix, between type and name, suffix)
fn split_declaration<'a>(decl: &'a str, type_name: &str, name: &str) -> (&'a str, &'a str, &'a str) {
    let Some(type_pos) = decl.find(type_name) else {
        return ("", "", "");
    };
    let type_end = type_pos + type_name.len();
    let Some(name_off) = decl[type_end..].find(name) else {
        return (&decl[..type_pos], &decl[type_end..], "");
    };
    let name_pos = type_end + name_off;
    (
        &decl[..type_pos],
        &decl[type_end..name_pos],
        &decl[name_pos + name.len()..],
    )
}

fn pointer_kind(between: &str) -> PointerKind {
    let stars = between.matches('*').count();
    match stars {
        0 => PointerKind::Value,
        1 => PointerKind::Single,
        _ if between.contains("const") => PointerKind::ConstPointerToPointer,
        _ => PointerKind::Double,
    }
}

fn has_const_word(text: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .any(|w| w == "const")
}

/// Length from the `len` attribute, the `altlen` encoding, or bracket dims
fn length_spec(member: &MemberNode, dims: &[String]) -> (Option<LengthSpec>, bool) {
    let Some(len) = member.len.as_deref() else {
        if dims.is_empty() {
            return (None, false);
        }
        return (Some(LengthSpec::Fixed(dims.to_vec())), false);
    };

    let encoded = if len.contains("latexmath") {
        member.altlen.as_deref().unwrap_or(len)
    } else {
        len
    };

    let mut parts = encoded.split(',').map(str::trim);
    let first = parts.next().unwrap_or("");
    let string_array = parts.any(|p| p == NULL_TERMINATED);

    let spec = if first == NULL_TERMINATED {
        LengthSpec::NullTerminated
    } else {
        LengthSpec::Named(rewrite_length_path(first))
    };
    (Some(spec), string_array)
}

/// Build the descriptor for `member`, inheriting constness from the context
pub fn describe(member: &MemberNode, inherited_const: bool, types: &impl TypeLookup) -> ParamDescriptor {
    let (prefix, between, suffix) = split_declaration(&member.decl, &member.type_name, &member.name);
    let pointer = pointer_kind(between);
    let own_const = has_const_word(prefix);

    let array_dims: Vec<String> = array_regex()
        .captures_iter(suffix)
        .map(|c| c[1].to_string())
        .collect();

    let (length, string_array_len) = length_spec(member, &array_dims);

    let fixed_size = if !array_dims.is_empty() {
        array_dims.iter().all(|d| is_fixed_token(d))
    } else {
        matches!(&length, Some(LengthSpec::Named(token)) if is_fixed_token(token))
    };

    let is_char = member.type_name == "char";
    let is_string_array = is_char && string_array_len && pointer.is_pointer();
    let is_string = is_char
        && length == Some(LengthSpec::NullTerminated)
        && !fixed_size
        && !is_string_array;

    let handle = types.handle_kind(&member.type_name);
    let is_struct = types.is_struct(&member.type_name);

    let optional = if pointer.is_pointer() {
        if is_string || is_string_array {
            false
        } else {
            !(handle.is_some() && length.is_none() && pointer == PointerKind::Single)
        }
    } else {
        member.optional_outer()
    };

    let is_const = own_const || inherited_const;

    ParamDescriptor {
        name: member.name.clone(),
        type_name: member.type_name.clone(),
        pointer,
        is_const,
        length,
        array_dims,
        fixed_size,
        optional,
        is_string,
        is_string_array,
        is_struct,
        handle,
        direction: direction_of(pointer, is_const),
    }
}

fn direction_of(pointer: PointerKind, is_const: bool) -> Direction {
    if pointer.is_pointer() && !is_const {
        Direction::Out
    } else {
        Direction::In
    }
}

impl ParamDescriptor {
    /// The same descriptor seen through a const-qualified context
    pub fn in_const_context(&self) -> Self {
        let mut desc = self.clone();
        desc.is_const = true;
        desc.direction = direction_of(desc.pointer, true);
        desc
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer.is_pointer()
    }

    pub fn is_handle(&self) -> bool {
        self.handle.is_some()
    }

    fn array_suffix(&self) -> String {
        self.array_dims.iter().map(|d| format!("[{}]", d)).collect()
    }

    fn base_type(&self) -> String {
        let mut out = String::new();
        if self.is_const {
            out.push_str("const ");
        }
        out.push_str(&self.type_name);
        out.push_str(self.pointer.stars());
        out
    }

    /// Declaration-style rendering: `const VkFoo* pFoo`, `uint8_t uuid[VK_UUID_SIZE]`
    pub fn render_declaration(&self) -> String {
        format!("{} {}{}", self.base_type(), self.name, self.array_suffix())
    }

    /// Callback-style rendering: pointers as declared, non-pointer values with a
    /// length as arrays, every other plain value by reference
    pub fn render_callback(&self) -> String {
        if self.is_pointer() {
            return self.render_declaration();
        }
        if !self.array_dims.is_empty() {
            return self.render_declaration();
        }
        match &self.length {
            Some(len) => format!("{} {}[{}]", self.base_type(), self.name, len.token()),
            None => format!("{}& {}", self.base_type(), self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lookup;

    impl TypeLookup for Lookup {
        fn is_struct(&self, name: &str) -> bool {
            name.ends_with("Info") || name == "VkExtent2D"
        }

        fn handle_kind(&self, name: &str) -> Option<HandleKind> {
            match name {
                "VkDevice" | "VkCommandBuffer" => Some(HandleKind::Dispatchable),
                "VkFence" | "VkBuffer" => Some(HandleKind::NonDispatchable),
                _ => None,
            }
        }
    }

    fn member(decl: &str, type_name: &str, name: &str) -> MemberNode {
        MemberNode {
            name: name.to_string(),
            type_name: type_name.to_string(),
            decl: decl.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_const_input_struct_pointer() {
        let d = describe(&member("const VkFenceCreateInfo* pCreateInfo", "VkFenceCreateInfo", "pCreateInfo"), false, &Lookup);
        assert_eq!(d.pointer, PointerKind::Single);
        assert!(d.is_const);
        assert!(d.is_struct);
        assert_eq!(d.direction, Direction::In);
        assert!(d.optional);
        assert_eq!(d.render_declaration(), "const VkFenceCreateInfo* pCreateInfo");
    }

    #[test]
    fn test_single_handle_output_is_required() {
        let d = describe(&member("VkFence* pFence", "VkFence", "pFence"), false, &Lookup);
        assert_eq!(d.direction, Direction::Out);
        assert_eq!(d.handle, Some(HandleKind::NonDispatchable));
        assert!(!d.optional);
    }

    #[test]
    fn test_handle_array_stays_optional() {
        let mut m = member("VkCommandBuffer* pCommandBuffers", "VkCommandBuffer", "pCommandBuffers");
        m.len = Some("pAllocateInfo::commandBufferCount".to_string());
        let d = describe(&m, false, &Lookup);
        assert!(d.optional);
        assert_eq!(d.length, Some(LengthSpec::Named("pAllocateInfo->commandBufferCount".to_string())));
        assert!(!d.fixed_size);
    }

    #[test]
    fn test_strings() {
        let mut name = member("const char* pName", "char", "pName");
        name.len = Some("null-terminated".to_string());
        let d = describe(&name, false, &Lookup);
        assert!(d.is_string);
        assert!(!d.is_string_array);
        assert!(!d.optional);

        let mut layers = member("const char* const* ppEnabledLayerNames", "char", "ppEnabledLayerNames");
        layers.len = Some("enabledLayerCount,null-terminated".to_string());
        layers.optional = Some("true".to_string());
        let d = describe(&layers, false, &Lookup);
        assert_eq!(d.pointer, PointerKind::ConstPointerToPointer);
        assert!(d.is_string_array);
        assert!(!d.is_string);
        assert!(!d.optional);
        assert_eq!(d.length, Some(LengthSpec::Named("enabledLayerCount".to_string())));
        assert_eq!(d.render_declaration(), "const char* const* ppEnabledLayerNames");
    }

    #[test]
    fn test_fixed_char_array_is_not_a_plain_string() {
        let mut m = member("char deviceName[VK_MAX_PHYSICAL_DEVICE_NAME_SIZE]", "char", "deviceName");
        m.len = Some("null-terminated".to_string());
        let d = describe(&m, false, &Lookup);
        assert!(d.fixed_size);
        assert!(!d.is_string);
        assert_eq!(d.array_dims, vec!["VK_MAX_PHYSICAL_DEVICE_NAME_SIZE"]);
        assert_eq!(d.render_declaration(), "char deviceName[VK_MAX_PHYSICAL_DEVICE_NAME_SIZE]");
    }

    #[test]
    fn test_fixed_arrays() {
        let d = describe(&member("float blendConstants[4]", "float", "blendConstants"), false, &Lookup);
        assert!(d.fixed_size);
        assert_eq!(d.length, Some(LengthSpec::Fixed(vec!["4".to_string()])));
        assert_eq!(d.render_callback(), "float blendConstants[4]");

        let d = describe(&member("float matrix[3][4]", "float", "matrix"), false, &Lookup);
        assert_eq!(d.array_dims, vec!["3", "4"]);
        assert_eq!(d.render_declaration(), "float matrix[3][4]");
    }

    #[test]
    fn test_double_pointer_and_latexmath() {
        let mut m = member("void** ppData", "void", "ppData");
        m.optional = Some("false,true".to_string());
        let d = describe(&m, false, &Lookup);
        assert_eq!(d.pointer, PointerKind::Double);
        assert_eq!(d.direction, Direction::Out);

        let mut code = member("const uint32_t* pCode", "uint32_t", "pCode");
        code.len = Some(r"latexmath:[\textrm{codeSize} \over 4]".to_string());
        code.altlen = Some("codeSize / 4".to_string());
        let d = describe(&code, false, &Lookup);
        assert_eq!(d.length, Some(LengthSpec::Named("codeSize / 4".to_string())));
        assert!(!d.fixed_size);
    }

    #[test]
    fn test_value_rendering_and_inherited_const() {
        let mut m = member("VkExtent2D extent", "VkExtent2D", "extent");
        m.optional = Some("true".to_string());
        let d = describe(&m, false, &Lookup);
        assert!(d.optional);
        assert_eq!(d.render_declaration(), "VkExtent2D extent");
        assert_eq!(d.render_callback(), "VkExtent2D& extent");

        let inherited = describe(&m, true, &Lookup);
        assert_eq!(inherited.render_callback(), "const VkExtent2D& extent");

        let out = describe(&member("VkBuffer* pBuffers", "VkBuffer", "pBuffers"), false, &Lookup);
        assert_eq!(out.direction, Direction::Out);
        let seen_const = out.in_const_context();
        assert_eq!(seen_const.direction, Direction::In);
        assert_eq!(seen_const.render_declaration(), "const VkBuffer* pBuffers");
    }

    #[test]
    fn test_fixed_tokens() {
        assert!(is_fixed_token("16"));
        assert!(is_fixed_token("VK_UUID_SIZE"));
        assert!(!is_fixed_token("count"));
        assert!(!is_fixed_token("pInfo->count"));
        assert!(!is_fixed_token("_"));
        assert!(!is_fixed_token(""));
    }
}
