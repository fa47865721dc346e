//! Access-control scenarios driven through `ResourceService`.

mod common;

use common::{draft, harness, principal, seed_group};
use recipebox_auth::{DenyCode, Principal, Role};
use recipebox_core::{GroupId, Page, RecipePatch, UserId, Visibility};
use recipebox_server::ServiceError;
use recipebox_storage::RecordStore;
use time::{Duration, OffsetDateTime};

fn deny_code(err: &ServiceError) -> Option<DenyCode> {
    match err {
        ServiceError::Forbidden(reason) => Some(reason.code),
        _ => None,
    }
}

#[tokio::test]
async fn test_member_creates_recipe_in_own_group() {
    let h = harness();
    let owner = principal(Role::Member);
    let member = principal(Role::Member);
    let group = seed_group(&h.store, owner.id, &[member.id]).await;

    // Prime the group's recipe list.
    let before = h
        .service
        .list_group_recipes(&member, group.id, Page::default())
        .await
        .unwrap();
    assert!(before.is_empty());

    let submitted = draft("Grandma's apple pie", Visibility::Group);
    let recipe = h
        .service
        .create_recipe(&member, group.id, submitted.clone())
        .await
        .unwrap();
    assert_eq!(recipe.title, submitted.title);
    assert_eq!(recipe.ingredients, submitted.ingredients);
    assert_eq!(recipe.instructions, submitted.instructions);
    assert_eq!(recipe.image_url, submitted.image_url);
    assert_eq!(recipe.visibility, Visibility::Group);
    assert_eq!(recipe.group_id, group.id);
    assert_eq!(recipe.created_by, member.id);

    let after = h
        .service
        .list_group_recipes(&owner, group.id, Page::default())
        .await
        .unwrap();
    assert_eq!(after, vec![recipe]);
}

#[tokio::test]
async fn test_non_member_cannot_create_recipe() {
    let h = harness();
    let owner = principal(Role::Member);
    let group = seed_group(&h.store, owner.id, &[]).await;
    let begun = h.store.stats().begun;

    let outsider = principal(Role::Member);
    let err = h
        .service
        .create_recipe(&outsider, group.id, draft("Stolen soup", Visibility::Group))
        .await
        .unwrap_err();
    assert_eq!(deny_code(&err), Some(DenyCode::NotAMember));
    assert_eq!(h.store.recipe_count().await, 0);
    assert_eq!(h.store.stats().begun, begun);
}

#[tokio::test]
async fn test_role_deny_never_reaches_storage() {
    let h = harness();
    let guest = principal(Role::Guest);
    let err = h.service.create_group(&guest, "Guests").await.unwrap_err();
    assert_eq!(deny_code(&err), Some(DenyCode::InsufficientRole));
    assert_eq!(h.store.stats().begun, 0);
    assert_eq!(h.store.group_count().await, 0);
}

#[tokio::test]
async fn test_guest_sees_only_public_recipes() {
    let h = harness();
    let owner = principal(Role::Premium);
    let guest = principal(Role::Guest);
    // Even a guest that is a member gets the public list only.
    let group = seed_group(&h.store, owner.id, &[guest.id]).await;

    let private = h
        .service
        .create_recipe(&owner, group.id, draft("Secret stew", Visibility::Group))
        .await
        .unwrap();
    let public = h
        .service
        .create_recipe(&owner, group.id, draft("Open bread", Visibility::Public))
        .await
        .unwrap();

    let seen = h
        .service
        .list_recipes(&guest, Page::default())
        .await
        .unwrap();
    assert_eq!(seen, vec![public.clone()]);

    let seen_by_owner = h
        .service
        .list_recipes(&owner, Page::default())
        .await
        .unwrap();
    assert_eq!(seen_by_owner.len(), 2);
    assert!(seen_by_owner.contains(&private));
    assert!(seen_by_owner.contains(&public));
}

#[tokio::test]
async fn test_public_recipe_is_readable_but_not_writable_by_outsiders() {
    let h = harness();
    let owner = principal(Role::Premium);
    let group = seed_group(&h.store, owner.id, &[]).await;
    let recipe = h
        .service
        .create_recipe(&owner, group.id, draft("Open bread", Visibility::Public))
        .await
        .unwrap();

    for role in Role::ALL {
        let outsider = principal(role);
        let read = h.service.get_recipe(&outsider, recipe.id).await.unwrap();
        assert_eq!(read.id, recipe.id);
    }

    let outsider = principal(Role::Member);
    let patch = RecipePatch {
        title: Some("Vandalized".into()),
        ..Default::default()
    };
    let err = h
        .service
        .update_recipe(&outsider, recipe.id, patch)
        .await
        .unwrap_err();
    assert_eq!(deny_code(&err), Some(DenyCode::NotAMember));
    let err = h
        .service
        .delete_recipe(&outsider, recipe.id)
        .await
        .unwrap_err();
    assert!(err.is_forbidden());
}

#[tokio::test]
async fn test_group_recipe_hidden_from_outsiders() {
    let h = harness();
    let owner = principal(Role::Member);
    let group = seed_group(&h.store, owner.id, &[]).await;
    let recipe = h
        .service
        .create_recipe(&owner, group.id, draft("Family curry", Visibility::Group))
        .await
        .unwrap();

    let outsider = principal(Role::Creator);
    let err = h
        .service
        .get_recipe(&outsider, recipe.id)
        .await
        .unwrap_err();
    assert_eq!(deny_code(&err), Some(DenyCode::NotAMember));

    let admin = principal(Role::Admin);
    let read = h.service.get_recipe(&admin, recipe.id).await.unwrap();
    assert_eq!(read, recipe);
}

#[tokio::test]
async fn test_duplicate_membership_is_a_conflict() {
    let h = harness();
    let owner = principal(Role::Member);
    let group = seed_group(&h.store, owner.id, &[]).await;
    let creator = principal(Role::Creator);
    let user = UserId::new();

    h.service
        .add_member(&creator, group.id, user)
        .await
        .unwrap();
    let err = h
        .service
        .add_member(&creator, group.id, user)
        .await
        .unwrap_err();
    assert!(err.is_conflict(), "{err:?}");
    assert_eq!(err.code(), "conflict");

    let members = h.store.list_members(group.id).await.unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn test_adding_members_needs_elevated_role() {
    let h = harness();
    let owner = principal(Role::Premium);
    let group = seed_group(&h.store, owner.id, &[]).await;

    let err = h
        .service
        .add_member(&owner, group.id, UserId::new())
        .await
        .unwrap_err();
    assert_eq!(deny_code(&err), Some(DenyCode::RoleNotAllowed));

    let err = h
        .service
        .add_member(&principal(Role::SuperAdmin), GroupId::new(), UserId::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_remove_member_rules() {
    let h = harness();
    let owner = principal(Role::Member);
    let member = principal(Role::Member);
    let group = seed_group(&h.store, owner.id, &[member.id]).await;

    let err = h
        .service
        .remove_member(&owner, group.id, owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation { .. }));

    let stranger = principal(Role::Premium);
    let err = h
        .service
        .remove_member(&stranger, group.id, member.id)
        .await
        .unwrap_err();
    assert_eq!(deny_code(&err), Some(DenyCode::NotOwner));

    h.service
        .remove_member(&owner, group.id, member.id)
        .await
        .unwrap();
    assert!(!h.store.is_member(member.id, group.id).await.unwrap());

    let err = h
        .service
        .remove_member(&owner, group.id, member.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_group_cascades() {
    let h = harness();
    let owner = principal(Role::Member);
    let members = [UserId::new(), UserId::new()];
    let group = seed_group(&h.store, owner.id, &members).await;
    let recipe = h
        .service
        .create_recipe(&owner, group.id, draft("Lasagne", Visibility::Group))
        .await
        .unwrap();

    // Not the owner and not elevated.
    let member = Principal::new(members[0], Role::Member);
    let err = h.service.delete_group(&member, group.id).await.unwrap_err();
    assert_eq!(deny_code(&err), Some(DenyCode::NotOwner));

    h.service.delete_group(&owner, group.id).await.unwrap();

    assert!(h.store.list_members(group.id).await.unwrap().is_empty());
    assert!(!h.store.get_recipe(recipe.id).await.unwrap().is_found());
    let err = h.service.get_group(&owner, group.id).await.unwrap_err();
    assert!(err.is_not_found());
    let err = h.service.get_recipe(&owner, recipe.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_expired_premium_cannot_publish() {
    let h = harness();
    let now = OffsetDateTime::now_utc();
    let expired = principal(Role::Premium).with_subscription_expiry(now - Duration::days(1));
    let group = seed_group(&h.store, expired.id, &[]).await;

    let err = h
        .service
        .create_recipe(&expired, group.id, draft("Cake", Visibility::Public))
        .await
        .unwrap_err();
    assert_eq!(deny_code(&err), Some(DenyCode::SubscriptionExpired));

    // Group-visible recipes are not a premium capability.
    h.service
        .create_recipe(&expired, group.id, draft("Cake", Visibility::Group))
        .await
        .unwrap();

    let admin = principal(Role::Admin).with_subscription_expiry(now - Duration::days(30));
    h.service
        .create_recipe(&admin, group.id, draft("Admin cake", Visibility::Public))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_publishing_via_update_needs_publish_capability() {
    let h = harness();
    let creator = principal(Role::Creator);
    let group = seed_group(&h.store, creator.id, &[]).await;
    let recipe = h
        .service
        .create_recipe(&creator, group.id, draft("Ribs", Visibility::Group))
        .await
        .unwrap();

    let publish = RecipePatch {
        visibility: Some(Visibility::Public),
        ..Default::default()
    };
    let err = h
        .service
        .update_recipe(&creator, recipe.id, publish)
        .await
        .unwrap_err();
    assert_eq!(deny_code(&err), Some(DenyCode::RoleNotAllowed));

    let rename = RecipePatch {
        title: Some("Smoked ribs".into()),
        ..Default::default()
    };
    let updated = h
        .service
        .update_recipe(&creator, recipe.id, rename)
        .await
        .unwrap();
    assert_eq!(updated.title, "Smoked ribs");
    assert_eq!(updated.visibility, Visibility::Group);
}

#[tokio::test]
async fn test_admin_bypasses_membership() {
    let h = harness();
    let owner = principal(Role::Member);
    let group = seed_group(&h.store, owner.id, &[]).await;
    let admin = principal(Role::Admin);

    assert_eq!(h.service.get_group(&admin, group.id).await.unwrap(), group);
    let members = h
        .service
        .list_group_members(&admin, group.id)
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    h.service
        .create_recipe(&admin, group.id, draft("Audit pie", Visibility::Group))
        .await
        .unwrap();
    h.service.delete_group(&admin, group.id).await.unwrap();
}

#[tokio::test]
async fn test_unknown_group_is_not_found() {
    let h = harness();
    let member = principal(Role::Member);
    let err = h
        .service
        .get_group(&member, GroupId::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code(), "not_found");
}
