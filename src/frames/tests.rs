//! Call-frame stack tests
//!
//! The test harness runs every test on its own thread, so each test starts
//! with an empty stack.

use super::*;
use std::thread;

fn names() -> Vec<String> {
    capture().entries().iter().map(|e| e.function.clone()).collect()
}

#[test]
fn starts_empty() {
    assert!(is_empty());
    assert_eq!(current_depth(), None);
    assert!(capture().is_empty());
}

#[test]
fn trace_lists_frames_most_recent_first() {
    let f1 = push(c"f1", c"main.bgl", 1);
    let f2 = push(c"f2", c"main.bgl", 10);
    let f3 = push(c"f3", c"lib.bgl", 20);

    assert_eq!((f1.depth(), f2.depth(), f3.depth()), (0, 1, 2));
    assert_eq!(names(), ["f3", "f2", "f1"]);

    drop(f3);
    assert_eq!(names(), ["f2", "f1"]);
    assert_eq!(current_depth(), Some(1));

    drop(f2);
    drop(f1);
    assert!(is_empty());
}

#[test]
fn trace_entries_carry_location() {
    let _outer = push(c"outer", c"a.bgl", 3);
    let _inner = push(c"inner", c"b.bgl", 7);

    let trace = capture();
    assert_eq!(
        trace.entries()[0],
        TraceEntry {
            function: "inner".into(),
            file: "b.bgl".into(),
            line: 7,
            depth: 1,
        }
    );
    assert_eq!(trace.entries()[1].file, "a.bgl");
}

#[test]
fn line_updates_are_visible_to_the_next_capture() {
    let frame = push(c"loop", c"loop.bgl", 1);
    for line in 2..=5 {
        frame.set_line(line);
    }
    assert_eq!(capture().entries()[0].line, 5);

    update_line(42);
    assert_eq!(frame.line(), 42);
}

#[test]
fn update_line_on_empty_stack_is_a_no_op() {
    update_line(9);
    assert!(is_empty());
}

#[test]
fn payload_is_sized_and_zeroed() {
    let mut frame = push_with_payload(c"locals", c"x.bgl", 1, 16);
    assert_eq!(frame.payload().len(), 16);
    assert!(frame.payload().iter().all(|&b| b == 0));

    frame.payload_mut()[0] = 0xAB;
    assert_eq!(frame.payload()[0], 0xAB);
    unsafe {
        assert_eq!((*frame.record_ptr()).size(), 16);
    }
}

#[test]
fn walk_is_lazy() {
    let _a = push(c"a", c"t.bgl", 1);
    let _b = push(c"b", c"t.bgl", 2);
    let _c = push(c"c", c"t.bgl", 3);

    let first = walk(|mut frames| frames.next().map(|f| f.function.to_owned()));
    assert_eq!(first.as_deref(), Some(c"c"));

    let count = walk(|frames| frames.count());
    assert_eq!(count, 3);
}

#[test]
fn walk_does_not_change_the_stack() {
    let _a = push(c"a", c"t.bgl", 1);
    let before = capture();
    assert_eq!(walk(|frames| frames.count()), 1);
    assert_eq!(capture(), before);
}

#[test]
fn frames_pushed_inside_a_walk_can_be_popped() {
    let _a = push(c"a", c"t.bgl", 1);
    let _b = push(c"b", c"t.bgl", 2);

    let (visited, helper_depth) = walk(|frames| {
        let helper = push(c"helper", c"t.bgl", 3);
        let depth = helper.depth();
        drop(helper);

        let nested = crate::enter_frame!("nested");
        let count = frames.count();
        drop(nested);
        (count, depth)
    });

    assert_eq!(visited, 2);
    assert_eq!(helper_depth, 2);
    assert_eq!(names(), ["b", "a"]);
}

#[test]
fn nested_walks_keep_the_outer_frames_protected() {
    let _a = push(c"a", c"t.bgl", 1);

    let inner = walk(|outer| {
        let helper = push(c"helper", c"t.bgl", 2);
        let inner = walk(|frames| frames.map(|f| f.depth).collect::<Vec<_>>());
        drop(helper);
        assert_eq!(outer.count(), 1);
        inner
    });

    assert_eq!(inner, [1, 0]);
    assert_eq!(WALK_FLOOR.with(Cell::get), None);
}

#[test]
fn threads_have_independent_stacks() {
    let _main = push(c"main", c"main.bgl", 1);

    let other = thread::spawn(|| {
        assert!(is_empty());
        let _worker = push(c"worker", c"worker.bgl", 1);
        names()
    })
    .join()
    .unwrap();

    assert_eq!(other, ["worker"]);
    assert_eq!(names(), ["main"]);
}

#[test]
fn caller_owned_records_share_the_chain() {
    let _rust = push(c"rust_caller", c"host.rs", 1);

    let mut record = FrameRecord::empty();
    let ptr = NonNull::from(&mut record);
    unsafe {
        push_record(ptr, c"generated".as_ptr(), c"gen.bgl".as_ptr(), 12);
        assert_eq!(ptr.as_ref().depth(), 1);
        assert_eq!(names(), ["generated", "rust_caller"]);
        pop_record(ptr);
    }
    assert_eq!(names(), ["rust_caller"]);

    let mut record = FrameRecord::empty();
    unsafe {
        push_record(NonNull::from(&mut record), c"again".as_ptr(), c"gen.bgl".as_ptr(), 1);
        pop();
    }
    assert_eq!(names(), ["rust_caller"]);
}

#[test]
fn macros_record_the_call_site() {
    let frame = crate::enter_frame!("macro_frame");
    assert_eq!(frame.function(), c"macro_frame");
    assert!(frame.file_name().to_str().unwrap().ends_with("tests.rs"));

    let before = frame.line();
    crate::track_line!(frame);
    assert!(frame.line() > before);
}

#[test]
fn display_truncates_long_traces() {
    let guards: Vec<_> = (0..100).map(|i| push(c"deep", c"deep.bgl", i)).collect();
    let rendered = capture().to_string();

    let shown = crate::config::get().limits.max_trace_frames;
    assert_eq!(rendered.lines().filter(|l| l.contains("deep.bgl")).count(), shown);
    assert!(rendered.contains(&format!("... {} more frames", 100 - shown)));
    assert!(rendered.starts_with("  #99 deep at deep.bgl:99"));

    drop(guards.into_iter().rev().collect::<Vec<_>>());
}
