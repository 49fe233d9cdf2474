//! Registry Loading
//!
//! Parses registry XML with `roxmltree` into the owned [`RegistryDocument`]
//! tree. Element order inside each section is preserved; attribute order and
//! interleaving of different child kinds inside a require block are not
//! significant.

use roxmltree::{Document, Node};

use super::{
    ApiList, CommandNode, Extension, Feature, HandleKind, MemberNode, Platform, RegistryDocument,
    RequireBlock, TypeCategory, TypeNode,
};
use crate::error::{RegistryError, Result};

/// Parse a full registry document
pub fn parse_document(xml: &str) -> Result<RegistryDocument> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();

    let mut registry = RegistryDocument::default();

    for section in element_children(root) {
        match section.tag_name().name() {
            "tags" => {
                for tag in children_named(section, "tag") {
                    if let Some(name) = tag.attribute("name") {
                        if !registry.tags.iter().any(|t| t == name) {
                            registry.tags.push(name.to_string());
                        }
                    }
                }
            }
            "platforms" => {
                for platform in children_named(section, "platform") {
                    registry.platforms.push(Platform {
                        name: required_attr(platform, "name", "platform")?,
                        protect: required_attr(platform, "protect", "platform")?,
                    });
                }
            }
            "extensions" => {
                for ext in children_named(section, "extension") {
                    registry.extensions.push(parse_extension(ext)?);
                }
            }
            "feature" => registry.features.push(parse_feature(section)?),
            "types" => {
                for ty in children_named(section, "type") {
                    if let Some(node) = parse_type(ty)? {
                        registry.types.push(node);
                    }
                }
            }
            "commands" => {
                for cmd in children_named(section, "command") {
                    registry.commands.push(parse_command(cmd)?);
                }
            }
            _ => {}
        }
    }

    tracing::debug!(
        tags = registry.tags.len(),
        extensions = registry.extensions.len(),
        features = registry.features.len(),
        types = registry.types.len(),
        commands = registry.commands.len(),
        "Parsed registry document"
    );

    Ok(registry)
}

// =============================================================================
// Sections
// =============================================================================

fn parse_extension(node: Node<'_, '_>) -> Result<Extension> {
    Ok(Extension {
        name: required_attr(node, "name", "extension")?,
        supported: node.attribute("supported").map(str::to_string),
        platform: node.attribute("platform").map(str::to_string),
        requires: children_named(node, "require").map(parse_require).collect(),
    })
}

fn parse_feature(node: Node<'_, '_>) -> Result<Feature> {
    Ok(Feature {
        name: required_attr(node, "name", "feature")?,
        api: node.attribute("api").map(ApiList::parse),
        number: node.attribute("number").map(str::to_string),
        requires: children_named(node, "require").map(parse_require).collect(),
    })
}

fn parse_require(node: Node<'_, '_>) -> RequireBlock {
    let mut block = RequireBlock {
        api: node.attribute("api").map(ApiList::parse),
        ..Default::default()
    };
    for child in element_children(node) {
        let Some(name) = child.attribute("name") else {
            continue;
        };
        match child.tag_name().name() {
            "command" => block.commands.push(name.to_string()),
            "enum" => block.enums.push(name.to_string()),
            "type" => block.types.push(name.to_string()),
            _ => {}
        }
    }
    block
}

fn parse_type(node: Node<'_, '_>) -> Result<Option<TypeNode>> {
    let Some(name) = node
        .attribute("name")
        .map(str::to_string)
        .or_else(|| child_text(node, "name"))
    else {
        // Unnamed <type> nodes are bare includes/comments; nothing to classify
        return Ok(None);
    };

    let alias = node.attribute("alias").map(str::to_string);
    let category = match node.attribute("category").unwrap_or("") {
        "struct" => TypeCategory::Struct {
            members: children_named(node, "member")
                .map(|m| parse_member(m, &name))
                .collect::<Result<Vec<_>>>()?,
            extends: split_list(node.attribute("structextends")),
        },
        "handle" => TypeCategory::Handle {
            parents: split_list(node.attribute("parent")),
            kind: if alias.is_some() {
                None
            } else {
                child_text(node, "type").map(|m| HandleKind::from_macro(&m))
            },
        },
        "enum" => TypeCategory::Enum,
        "basetype" => TypeCategory::BaseType {
            underlying: child_text(node, "type"),
        },
        "bitmask" => TypeCategory::Bitmask {
            underlying: child_text(node, "type"),
        },
        other => TypeCategory::Other(other.to_string()),
    };

    Ok(Some(TypeNode {
        name,
        alias,
        api: node.attribute("api").map(ApiList::parse),
        category,
    }))
}

fn parse_command(node: Node<'_, '_>) -> Result<CommandNode> {
    let api = node.attribute("api").map(ApiList::parse);

    if let Some(alias) = node.attribute("alias") {
        return Ok(CommandNode {
            name: required_attr(node, "name", "command alias")?,
            alias: Some(alias.to_string()),
            api,
            params: Vec::new(),
        });
    }

    let name = child_named(node, "proto")
        .and_then(|proto| child_text(proto, "name"))
        .ok_or_else(|| RegistryError::MissingElement {
            element: "proto/name".to_string(),
            context: "command".to_string(),
        })?;

    let params = children_named(node, "param")
        .map(|p| parse_member(p, &name))
        .collect::<Result<Vec<_>>>()?;

    Ok(CommandNode {
        name,
        alias: None,
        api,
        params,
    })
}

fn parse_member(node: Node<'_, '_>, owner: &str) -> Result<MemberNode> {
    let missing = |element: &str| RegistryError::MissingElement {
        element: element.to_string(),
        context: owner.to_string(),
    };
    let name = child_text(node, "name").ok_or_else(|| missing("name"))?;
    let type_name = child_text(node, "type").ok_or_else(|| missing("type"))?;

    Ok(MemberNode {
        name,
        type_name,
        decl: declaration_text(node),
        api: node.attribute("api").map(ApiList::parse),
        optional: attr(node, "optional"),
        len: attr(node, "len"),
        altlen: attr(node, "altlen"),
        externsync: attr(node, "externsync"),
        values: attr(node, "values"),
    })
}

// =============================================================================
// Node helpers
// =============================================================================

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn children_named<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    element_children(node).filter(move |n| n.tag_name().name() == name)
}

fn child_named<'a, 'input>(node: Node<'a, 'input>, name: &'static str) -> Option<Node<'a, 'input>> {
    children_named(node, name).next()
}

fn child_text(node: Node<'_, '_>, name: &'static str) -> Option<String> {
    child_named(node, name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
}

fn attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name).map(str::to_string)
}

fn required_attr(node: Node<'_, '_>, name: &str, context: &str) -> Result<String> {
    node.attribute(name)
        .map(str::to_string)
        .ok_or_else(|| RegistryError::MissingElement {
            element: format!("@{}", name),
            context: context.to_string(),
        })
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Flattened declaration text of a member/param, `<comment>` children excluded,
/// whitespace collapsed.
fn declaration_text(node: Node<'_, '_>) -> String {
    let mut raw = String::new();
    for child in node.children() {
        if child.is_text() {
            raw.push_str(child.text().unwrap_or(""));
        } else if child.is_element() && child.tag_name().name() != "comment" {
            for text in child.descendants().filter(|n| n.is_text()) {
                raw.push_str(text.text().unwrap_or(""));
            }
        }
    }
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<registry>
        <platforms>
            <platform name="xlib" protect="VK_USE_PLATFORM_XLIB_KHR" comment="X Window System"/>
        </platforms>
        <tags>
            <tag name="NV" author="NVIDIA"/>
            <tag name="KHR" author="Khronos"/>
        </tags>
        <types>
            <type category="include" name="vk_platform">#include "vk_platform.h"</type>
            <type category="handle" parent="VkDevice"><type>VK_DEFINE_NON_DISPATCHABLE_HANDLE</type>(<name>VkFence</name>)</type>
            <type category="handle" name="VkFenceKHR" alias="VkFence"/>
            <type category="struct" name="VkFenceCreateInfo">
                <member values="VK_STRUCTURE_TYPE_FENCE_CREATE_INFO"><type>VkStructureType</type> <name>sType</name></member>
                <member optional="true">const <type>void</type>* <name>pNext</name><comment>chain</comment></member>
                <member><type>uint8_t</type> <name>uuid</name>[<enum>VK_UUID_SIZE</enum>]</member>
            </type>
        </types>
        <commands>
            <command>
                <proto><type>VkResult</type> <name>vkCreateFence</name></proto>
                <param><type>VkDevice</type> <name>device</name></param>
                <param>const <type>VkFenceCreateInfo</type>* <name>pCreateInfo</name></param>
            </command>
            <command name="vkCreateFenceKHR" alias="vkCreateFence"/>
        </commands>
        <feature api="vulkan,vulkansc" name="VK_VERSION_1_0" number="1.0">
            <require><type name="VkFence"/><command name="vkCreateFence"/></require>
        </feature>
        <extensions>
            <extension name="VK_KHR_xlib_surface" supported="vulkan" platform="xlib">
                <require api="vulkan"><enum name="VK_KHR_XLIB_SURFACE_SPEC_VERSION"/></require>
            </extension>
        </extensions>
    </registry>"#;

    #[test]
    fn test_sections_are_parsed() {
        let doc = parse_document(SAMPLE).unwrap();
        assert_eq!(doc.tags, vec!["NV", "KHR"]);
        assert_eq!(doc.platform("xlib").unwrap().protect, "VK_USE_PLATFORM_XLIB_KHR");
        assert_eq!(doc.features.len(), 1);
        assert_eq!(doc.features[0].number.as_deref(), Some("1.0"));
        assert_eq!(doc.extensions[0].platform.as_deref(), Some("xlib"));
        assert_eq!(doc.extensions[0].requires[0].enums, vec!["VK_KHR_XLIB_SURFACE_SPEC_VERSION"]);
        // the unnamed include is skipped, the named one is kept as Other
        assert_eq!(doc.types.len(), 4);
    }

    #[test]
    fn test_handle_nodes() {
        let doc = parse_document(SAMPLE).unwrap();
        let fence = doc.types.iter().find(|t| t.name == "VkFence").unwrap();
        assert_eq!(
            fence.category,
            TypeCategory::Handle {
                parents: vec!["VkDevice".to_string()],
                kind: Some(HandleKind::NonDispatchable),
            }
        );
        let alias = doc.types.iter().find(|t| t.name == "VkFenceKHR").unwrap();
        assert!(alias.is_alias());
        assert!(matches!(alias.category, TypeCategory::Handle { kind: None, .. }));
    }

    #[test]
    fn test_member_declaration_text() {
        let doc = parse_document(SAMPLE).unwrap();
        let info = doc.types.iter().find(|t| t.name == "VkFenceCreateInfo").unwrap();
        let TypeCategory::Struct { members, .. } = &info.category else {
            panic!("expected struct");
        };
        assert_eq!(members[0].values.as_deref(), Some("VK_STRUCTURE_TYPE_FENCE_CREATE_INFO"));
        assert_eq!(members[1].decl, "const void* pNext");
        assert_eq!(members[2].decl, "uint8_t uuid[VK_UUID_SIZE]");
    }

    #[test]
    fn test_commands_and_aliases() {
        let doc = parse_document(SAMPLE).unwrap();
        assert_eq!(doc.commands.len(), 2);
        assert_eq!(doc.commands[0].name, "vkCreateFence");
        assert_eq!(doc.commands[0].params.len(), 2);
        assert_eq!(doc.commands[1].alias.as_deref(), Some("vkCreateFence"));
        assert!(doc.commands[1].params.is_empty());
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(matches!(
            parse_document("<registry><types></registry>"),
            Err(RegistryError::Xml(_))
        ));
    }
}
