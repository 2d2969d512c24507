//! Reuse of composite (through) legs under each composite reuse policy

mod common;

use std::sync::Arc;

use elif_associations::{
    AssociationConfig, AssociationError, AssociationOptions, AssociationType, AttributeDefinition,
    CompositeReusePolicy, DataType, IncompatibilityStatus, ModelBuilder, ModelDefinition, ModelName, ModelRef,
    ModelRegistry, ReferentialAction, ThroughOptions,
};

use common::{define, init_tracing};

const POLICIES: [CompositeReusePolicy; 3] = [
    CompositeReusePolicy::Tolerant,
    CompositeReusePolicy::OptionsOnly,
    CompositeReusePolicy::Strict,
];

fn registry(policy: CompositeReusePolicy) -> ModelRegistry {
    ModelRegistry::with_config(AssociationConfig::default().with_composite_reuse(policy))
}

fn attribute_names(model: &ModelRef) -> Vec<String> {
    model.attributes().into_keys().collect()
}

#[test]
fn test_belongs_to_many_declares_legs() {
    init_tracing();
    let registry = ModelRegistry::new();
    let post = define(&registry, "Post");
    let tag = define(&registry, "Tag");

    let tags = registry
        .belongs_to_many(&post, &tag, AssociationOptions::new().through("Tagging"))
        .unwrap();

    let tagging = registry.resolve("Tagging").expect("join model defined");
    let legs = tags.through().unwrap();
    assert!(Arc::ptr_eq(&legs.through, &tagging));
    assert!(Arc::ptr_eq(&post.association("Taggings").unwrap(), &legs.from_source));
    assert!(Arc::ptr_eq(&tag.association("Taggings").unwrap(), &legs.from_target));
    assert_eq!(legs.from_source.association_type(), AssociationType::HasMany);

    assert!(Arc::ptr_eq(&legs.from_source.root_association(), &tags));
    let inverse = tagging.association("Post").unwrap();
    assert!(Arc::ptr_eq(&inverse.root_association(), &tags));
    assert_eq!(inverse.parent_chain().len(), 2);

    assert_eq!(attribute_names(&tagging), vec!["postId", "tagId"]);
    for key in ["postId", "tagId"] {
        let attribute = tagging.attribute(key).unwrap();
        assert!(!attribute.allow_null);
        assert_eq!(attribute.on_delete, Some(ReferentialAction::Cascade));
    }

    let again = registry
        .belongs_to_many(&post, &tag, AssociationOptions::new().through("Tagging"))
        .unwrap();
    assert!(Arc::ptr_eq(&tags, &again));
    assert_eq!(attribute_names(&tagging), vec!["postId", "tagId"]);
}

#[test]
fn test_self_association_keeps_both_legs() {
    for policy in POLICIES {
        let registry = registry(policy);
        let user = define(&registry, "User");

        let friends = registry
            .belongs_to_many(&user, &user, AssociationOptions::new().alias("friends").through("Friendship"))
            .unwrap();

        let friendship = registry.resolve("Friendship").unwrap();
        let legs = friends.through().unwrap();
        assert!(!Arc::ptr_eq(&legs.from_source, &legs.from_target));
        assert_eq!(legs.from_source.alias(), "Friendships");
        assert_eq!(legs.from_target.alias(), "friendFriendships");
        assert_eq!(legs.from_source.foreign_key(), "userId");
        assert_eq!(legs.from_target.foreign_key(), "friendId");

        assert!(friendship.has_attribute("userId"), "{} policy", policy);
        assert!(friendship.has_attribute("friendId"), "{} policy", policy);
        assert_eq!(friendship.association("User").unwrap().foreign_key(), "userId");
        assert_eq!(friendship.association("friend").unwrap().foreign_key(), "friendId");
    }
}

#[test]
fn test_self_association_leg_aliases_can_be_set() {
    let registry = ModelRegistry::new();
    let user = define(&registry, "User");

    let followers = registry
        .belongs_to_many(
            &user,
            &user,
            AssociationOptions::new()
                .alias("followers")
                .through(ThroughOptions::new("Follow").source_alias("followings").target_alias("follows")),
        )
        .unwrap();

    let legs = followers.through().unwrap();
    assert!(Arc::ptr_eq(&user.association("followings").unwrap(), &legs.from_source));
    assert!(Arc::ptr_eq(&user.association("follows").unwrap(), &legs.from_target));

    let err = registry
        .belongs_to_many(
            &user,
            &user,
            AssociationOptions::new()
                .alias("blocked")
                .through(ThroughOptions::new("Block").source_alias("blocks").target_alias("blocks")),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        AssociationError::Construction { ref cause, .. } if matches!(**cause, AssociationError::InvalidOptions { .. })
    ));
    // the join model defined for the failed declaration is gone again
    assert!(!registry.is_defined("Block"));
    assert!(user.association("blocked").is_none());
}

#[test]
fn test_leg_with_different_options_by_policy() {
    for policy in POLICIES {
        let registry = registry(policy);
        let post = define(&registry, "Post");
        let tag = define(&registry, "Tag");
        let label = define(&registry, "Label");

        registry
            .belongs_to_many(&post, &tag, AssociationOptions::new().through("Tagging"))
            .unwrap();
        // the Post leg differs from the existing one in foreignKeyConstraints only
        let result = registry.belongs_to_many(
            &post,
            &label,
            AssociationOptions::new().through("Tagging").foreign_key_constraints(false),
        );
        let tagging = registry.resolve("Tagging").unwrap();

        if policy == CompositeReusePolicy::Strict {
            assert_eq!(result.unwrap_err().incompatibility(), Some(IncompatibilityStatus::DifferentOptions));
            assert_eq!(attribute_names(&tagging), vec!["postId", "tagId"]);
            assert!(label.association("Taggings").is_none());
            assert!(post.association("Labels").is_none());
        } else {
            let labels = result.unwrap();
            let legs = labels.through().unwrap();
            assert!(Arc::ptr_eq(&legs.from_source, &post.association("Taggings").unwrap()));
            assert_eq!(attribute_names(&tagging), vec!["labelId", "postId", "tagId"]);
            assert!(tagging.attribute("labelId").unwrap().references.is_none());
        }
    }
}

#[test]
fn test_leg_with_different_foreign_key_is_never_reused() {
    for policy in POLICIES {
        let registry = registry(policy);
        let post = define(&registry, "Post");
        let tag = define(&registry, "Tag");
        let label = define(&registry, "Label");

        registry
            .belongs_to_many(&post, &tag, AssociationOptions::new().through("Tagging"))
            .unwrap();
        let err = registry
            .belongs_to_many(&post, &label, AssociationOptions::new().through("Tagging").foreign_key("entryId"))
            .unwrap_err();

        assert_eq!(err.incompatibility(), Some(IncompatibilityStatus::DifferentOptions));
        let tagging = registry.resolve("Tagging").unwrap();
        assert_eq!(attribute_names(&tagging), vec!["postId", "tagId"]);
        assert!(post.association("Labels").is_none());
    }
}

#[test]
fn test_leg_with_different_target_by_policy() {
    let declare_both = |registry: &ModelRegistry, labeling: ModelBuilder| {
        let post = define(registry, "Post");
        let tag = define(registry, "Tag");
        let label = define(registry, "Label");
        // a second join model whose plural collides with Tagging's
        let labeling = registry.define(labeling).unwrap();

        registry
            .belongs_to_many(&post, &tag, AssociationOptions::new().through("Tagging"))
            .unwrap();
        let result = registry.belongs_to_many(&post, &label, AssociationOptions::new().through("Labeling"));
        (post, label, labeling, result)
    };
    let labeling = || {
        ModelDefinition::builder("Labeling")
            .names(ModelName::new("Tagging", "Taggings"))
            .table_name("Labelings")
    };

    // reusing the leg would leave Labeling without postId under any policy
    for policy in [CompositeReusePolicy::Tolerant, CompositeReusePolicy::OptionsOnly] {
        let registry = registry(policy);
        let (post, label, labeling, result) = declare_both(&registry, labeling());
        assert_eq!(result.unwrap_err().incompatibility(), Some(IncompatibilityStatus::DifferentTargets));
        assert!(attribute_names(&labeling).is_empty());
        assert!(post.association("Labels").is_none());
        assert!(label.association("Taggings").is_none());
    }

    // once Labeling carries postId itself, only the tolerant policy reuses the leg
    let with_key = || {
        labeling().attribute(AttributeDefinition::new("postId", DataType::Integer).not_null())
    };

    let tolerant = registry(CompositeReusePolicy::Tolerant);
    let (post, _, labeling_model, labels) = declare_both(&tolerant, with_key());
    let labels = labels.unwrap();
    assert_eq!(labels.through().unwrap().from_source.target().name(), "Tagging");
    assert!(post.association("Labels").is_some());
    assert_eq!(attribute_names(&labeling_model), vec!["labelId", "postId"]);

    let options_only = registry(CompositeReusePolicy::OptionsOnly);
    let (post, _, labeling_model, result) = declare_both(&options_only, with_key());
    assert_eq!(result.unwrap_err().incompatibility(), Some(IncompatibilityStatus::DifferentTargets));
    assert!(post.association("Labels").is_none());
    assert_eq!(attribute_names(&labeling_model), vec!["postId"]);
}

#[test]
fn test_plain_declaration_never_reuses_incompatible_leg() {
    let registry = ModelRegistry::new();
    let post = define(&registry, "Post");
    let tag = define(&registry, "Tag");
    registry
        .belongs_to_many(&post, &tag, AssociationOptions::new().through("Tagging"))
        .unwrap();

    let err = registry
        .has_many(&post, "Tagging", AssociationOptions::new().alias("Taggings").foreign_key("entryId"))
        .unwrap_err();

    assert!(matches!(
        err,
        AssociationError::Conflict {
            status: IncompatibilityStatus::DifferentOptions,
            ..
        }
    ));
    assert!(!registry.resolve("Tagging").unwrap().has_attribute("entryId"));
}

#[test]
fn test_strict_config_from_constructor() {
    let config = AssociationConfig::strict();
    assert_eq!(config.composite_reuse, CompositeReusePolicy::Strict);
    assert!(config.foreign_key_constraints);

    let registry = ModelRegistry::with_config(config);
    let post = define(&registry, "Post");
    let tag = define(&registry, "Tag");

    // distinct models never share a leg, so strict reuse still succeeds
    assert!(registry
        .belongs_to_many(&post, &tag, AssociationOptions::new().through("Tagging"))
        .is_ok());
    assert_eq!(attribute_names(&registry.resolve("Tagging").unwrap()), vec!["postId", "tagId"]);
}
