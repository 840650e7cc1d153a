use flow_twodee::{
    Duration,
    event::{MouseAction, MouseButton, MouseEvent},
    layers::Layers,
};

use crate::common::test_utils::{CallLog, RecordingLayer, RecordingTarget};

mod common;

fn stack(log: &CallLog, layers: &[(&'static str, bool)]) -> Layers {
    let mut stack = Layers::new();
    for &(name, handles) in layers {
        stack.push(RecordingLayer::boxed(name, handles, log));
    }
    stack
}

#[test]
fn unhandled_event_stops_propagation() {
    let log = CallLog::default();
    let mut layers = stack(&log, &[("a", true), ("b", false), ("c", true)]);

    let handled = layers.handle_mouse_event(&MouseEvent::moved(1.0, 2.0));

    assert!(!handled);
    assert_eq!(*log.borrow(), vec!["a:mouse", "b:mouse"]);
}

#[test]
fn event_handled_by_every_layer() {
    let log = CallLog::default();
    let mut layers = stack(&log, &[("a", true), ("b", true), ("c", true)]);

    let event = MouseEvent::pressed(3.0, 4.0, MouseButton::Left);
    assert!(layers.handle_mouse_event(&event));
    assert_eq!(*log.borrow(), vec!["a:mouse", "b:mouse", "c:mouse"]);
}

#[test]
fn empty_stack_handles_everything() {
    let mut layers = Layers::new();

    assert!(layers.handle_mouse_event(&MouseEvent::moved(0.0, 0.0)));
    assert!(layers.is_empty());
}

#[test]
fn fan_out_runs_bottom_to_top() {
    let log = CallLog::default();
    let mut layers = stack(&log, &[("a", true), ("b", true)]);
    let mut target = RecordingTarget::new();

    layers.update(Duration::from_millis(16));
    layers.render(&mut target);
    layers.delete();

    assert_eq!(
        *log.borrow(),
        vec![
            "a:update", "b:update", "a:render", "b:render", "a:delete", "b:delete"
        ]
    );
}

#[test]
fn pop_removes_the_top_layer_without_deleting_it() {
    let log = CallLog::default();
    let mut layers = stack(&log, &[("a", true), ("b", false)]);

    let popped = layers.pop();

    assert!(popped.is_some());
    assert_eq!(layers.len(), 1);
    assert!(log.borrow().is_empty());
    // the unhandling layer is gone
    assert!(layers.handle_mouse_event(&MouseEvent::moved(0.0, 0.0)));
}

#[test]
fn pop_on_an_empty_stack() {
    let mut layers = Layers::new();

    assert!(layers.pop().is_none());
    assert_eq!(layers.len(), 0);
}

#[test]
fn mouse_event_constructors() {
    let moved = MouseEvent::moved(1.5, 2.5);
    assert_eq!((moved.action, moved.button), (MouseAction::Move, None));

    let released = MouseEvent::released(0.0, 0.0, MouseButton::Other(7));
    assert_eq!(released.action, MouseAction::Release);
    assert_eq!(released.button, Some(MouseButton::Other(7)));

    assert_eq!(
        MouseButton::from(winit::event::MouseButton::Back),
        MouseButton::Other(3)
    );
}

#[test]
fn physical_positions_become_logical() {
    let event = MouseEvent::pressed(1600.0, 900.0, MouseButton::Right).to_logical(2.0);

    assert_eq!((event.x, event.y), (800.0, 450.0));
    assert_eq!(event.action, MouseAction::Press);
    assert_eq!(event.button, Some(MouseButton::Right));

    let unscaled = MouseEvent::moved(12.5, 3.0).to_logical(1.0);
    assert_eq!(unscaled, MouseEvent::moved(12.5, 3.0));
}
