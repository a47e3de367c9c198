//! End-to-end scenarios against the simulated device.

use focuslock_app::{Command, CommandError, Reply};
use focuslock_core::{
    AppId, Capability, EnforcementAction,
    observation::{KEYCODE_APP_SWITCH, KEYCODE_BACK, KEYCODE_HOME},
};
use focuslock_harness::{Scenario, SimConfig, SimWorld};
use insta::assert_json_snapshot;

const GUARDED: &str = "com.example.focuslock";

#[test]
fn locked_back_is_consumed_with_interception() {
    let outcome = Scenario::new()
        .grant(Capability::InputInterception)
        .locked()
        .press(KEYCODE_BACK)
        .run();

    assert!(outcome.is_clean());
    assert_json_snapshot!(outcome.last(), @r#"
    {
      "observation": {
        "Key": {
          "key_code": 4,
          "action": 0
        }
      },
      "lock": "Locked",
      "actions": [
        "ConsumeInput"
      ],
      "foreground": "com.example.focuslock",
      "overlay_drawn": false
    }
    "#);
}

#[test]
fn foreign_app_is_covered_by_overlay() {
    let outcome = Scenario::new()
        .grant(Capability::OverlayDraw)
        .locked()
        .launch("other.app")
        .run();

    assert!(outcome.is_clean());
    assert!(outcome.overlay_drawn);
    assert_eq!(outcome.foreground, AppId::new(GUARDED));
    assert_eq!(outcome.stats.enforced, 1);
    assert_json_snapshot!(outcome.last(), @r#"
    {
      "observation": {
        "Accessibility": {
          "event_type": 32,
          "package": "other.app"
        }
      },
      "lock": "Locked",
      "actions": [
        "SuppressAndRestore",
        "ShowOverlay"
      ],
      "foreground": "com.example.focuslock",
      "overlay_drawn": true
    }
    "#);
}

#[test]
fn strict_kiosk_restores_without_overlay() {
    let outcome = Scenario::new()
        .grant(Capability::StrictKiosk)
        .grant(Capability::OverlayDraw)
        .locked()
        .launch("other.app")
        .run();

    assert!(outcome.is_clean());
    assert!(!outcome.overlay_drawn);
    assert_json_snapshot!(outcome.last(), @r#"
    {
      "observation": {
        "Accessibility": {
          "event_type": 32,
          "package": "other.app"
        }
      },
      "lock": "Locked",
      "actions": [
        "SuppressAndRestore",
        "HideOverlay"
      ],
      "foreground": "com.example.focuslock",
      "overlay_drawn": false
    }
    "#);
}

#[test]
fn unlocked_home_is_allowed() {
    let outcome = Scenario::new().unlocked().press(KEYCODE_HOME).run();

    assert!(outcome.is_clean());
    assert_eq!(outcome.stats.enforced, 0);
    assert_json_snapshot!(outcome.last(), @r#"
    {
      "observation": {
        "Key": {
          "key_code": 3,
          "action": 0
        }
      },
      "lock": "Unlocked",
      "actions": [
        "Allow",
        "HideOverlay"
      ],
      "foreground": "com.example.focuslock",
      "overlay_drawn": false
    }
    "#);
}

#[test]
fn overlay_lifts_once_restore_is_observed() {
    let outcome = Scenario::new()
        .grant(Capability::OverlayDraw)
        .locked()
        .launch("other.app")
        .deliver_pending()
        .run();

    assert!(outcome.is_clean());
    assert!(!outcome.overlay_drawn);
    let actions: Vec<_> = outcome.trace.iter().map(|entry| entry.actions.clone()).collect();
    assert_json_snapshot!(actions, @r#"
    [
      [
        "Allow"
      ],
      [
        "SuppressAndRestore",
        "ShowOverlay"
      ],
      [
        "Allow",
        "HideOverlay"
      ]
    ]
    "#);
}

#[test]
fn shade_is_dismissed_before_restore() {
    let mut world = SimWorld::new(SimConfig::default());
    world.lock();
    world.open_shade();

    world.launch("com.android.settings");
    assert!(!world.device().shade_open());
    assert_eq!(world.device().foreground(), AppId::new(GUARDED));
    assert!(world.violations().is_empty());
}

#[test]
fn restore_is_lost_to_open_shade_without_dismissal() {
    let mut world = SimWorld::new(SimConfig { dismiss_supported: false, ..Default::default() });
    world.lock();
    world.open_shade();

    let entry = world.launch("com.android.settings");
    assert_eq!(entry.actions, vec![
        EnforcementAction::SuppressAndRestore,
        EnforcementAction::HideOverlay
    ]);
    assert!(entry.failed.is_none());
    assert!(world.device().shade_open());
    assert_eq!(world.device().foreground(), AppId::new("com.android.settings"));

    // Same device with the shade closed.
    let mut closed = SimWorld::new(SimConfig { dismiss_supported: false, ..Default::default() });
    closed.lock();
    closed.launch("com.android.settings");
    assert_eq!(closed.device().foreground(), AppId::new(GUARDED));
}

#[test]
fn failed_dismiss_still_restores() {
    let mut world = SimWorld::new(SimConfig::default());
    world.grant(Capability::InputInterception);
    world.lock();
    world.fail_next(1);

    let entry = world.launch("org.mozilla.firefox");
    assert!(entry.failed.as_deref().is_some_and(|e| e.contains("DismissSystemSurfaces")));
    assert_eq!(entry.foreground, GUARDED);
    assert_eq!(world.device().foreground(), AppId::new(GUARDED));
    assert_eq!(world.stats().failures, 1);

    let delivered = world.deliver_pending();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].failed.is_none());
    assert_eq!(world.device().foreground(), AppId::new(GUARDED));
    assert!(world.violations().is_empty());
}

#[test]
fn navigation_keys_pass_without_interception() {
    let outcome = Scenario::new()
        .grant(Capability::OverlayDraw)
        .locked()
        .press(KEYCODE_BACK)
        .press(KEYCODE_HOME)
        .press(KEYCODE_APP_SWITCH)
        .run();

    assert!(outcome.is_clean());
    for entry in &outcome.trace[1..] {
        assert_eq!(entry.actions, vec![EnforcementAction::Allow]);
    }
}

#[test]
fn revoked_overlay_permission_stops_cover() {
    let outcome = Scenario::new()
        .grant(Capability::OverlayDraw)
        .locked()
        .launch("other.app")
        .deliver_pending()
        .revoke(Capability::OverlayDraw)
        .launch("other.app")
        .run();

    assert!(outcome.is_clean());
    assert!(!outcome.overlay_drawn);
    assert_eq!(outcome.last().map(|entry| entry.actions.clone()), Some(vec![
        EnforcementAction::SuppressAndRestore,
        EnforcementAction::HideOverlay
    ]));
}

#[test]
fn host_commands_reach_the_device() {
    let outcome = Scenario::new()
        .command(Command::IsDeviceOwner)
        .command(Command::StartLockTask)
        .command(Command::IsInLockTaskMode)
        .command(Command::ShowOverlay)
        .grant(Capability::OverlayDraw)
        .command(Command::ShowOverlay)
        .command(Command::SetBackGestureExclusion)
        .run();

    assert_eq!(outcome.replies, vec![
        Ok(Reply::Bool(false)),
        Ok(Reply::Unit),
        Ok(Reply::Bool(true)),
        Err(CommandError::PermissionDenied("Overlay permission not granted".into())),
        Ok(Reply::Bool(true)),
        Ok(Reply::Bool(true)),
    ]);
    assert!(outcome.overlay_drawn);
}

#[test]
fn lock_task_notice_is_passed_through() {
    let mut world = SimWorld::new(SimConfig::default());
    world.device().set_device_owner(true);
    world.command(Command::StartLockTask).unwrap();

    let delivered = world.deliver_pending();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].actions, vec![EnforcementAction::Allow]);

    assert!(world.device().take_calls().is_empty());
}

#[test]
fn repeated_show_overlay_changes_nothing() {
    let mut world = SimWorld::new(SimConfig::default());
    world.grant(Capability::OverlayDraw);
    world.lock();
    world.launch("other.app");
    assert!(world.device().overlay_drawn());
    world.device().take_pending();
    world.device().take_calls();

    let before = (world.device().overlay_drawn(), world.overlay_mirror(), world.device().foreground());
    assert_eq!(world.command(Command::ShowOverlay), Ok(Reply::Bool(true)));
    assert_eq!(world.command(Command::ShowOverlay), Ok(Reply::Bool(true)));
    let after = (world.device().overlay_drawn(), world.overlay_mirror(), world.device().foreground());

    assert_eq!(before, after);
    assert_eq!(world.device().pending_len(), 0);
    assert!(world.violations().is_empty());
}

#[test]
fn repeated_hide_overlay_changes_nothing() {
    let mut world = SimWorld::new(SimConfig::default());
    world.grant(Capability::OverlayDraw);
    world.command(Command::ShowOverlay).unwrap();

    let first = world.press(KEYCODE_HOME);
    let second = world.press(KEYCODE_HOME);
    assert_eq!(first.actions, second.actions);
    assert_eq!(first.foreground, second.foreground);
    assert!(!second.overlay_drawn);
    assert_eq!(world.device().pending_len(), 0);
    assert_eq!(world.stats().failures, 0);
    assert!(world.violations().is_empty());
}
