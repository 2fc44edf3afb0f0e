#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use turnorder_core::{
    ContactId, MemoryModeStore, Mode, PickerConfig, Position, ScriptedRandom, Session, SizeHint,
};
use web_time::Duration;

#[derive(Debug, Arbitrary)]
enum Op {
    Press { id: u8, x: i16, y: i16, size: Option<(u16, u16)> },
    Move { id: u8, x: i16, y: i16 },
    Release { id: u8 },
    Advance { ms: u16 },
    Frame,
    SetMode { contact_pick: bool },
    Reset,
    Force { active: bool },
    DeviceLimit { points: Option<u8> },
}

#[derive(Debug, Arbitrary)]
struct Input {
    script: Vec<u8>,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let store = MemoryModeStore::with_value("turnorder.lastMode", "contact-pick");
    let rng = ScriptedRandom::new(input.script.iter().map(|&b| usize::from(b)));
    let Ok(mut session) = Session::new(PickerConfig::default(), Box::new(store), rng) else {
        return;
    };

    for op in input.ops.into_iter().take(512) {
        match op {
            Op::Press { id, x, y, size } => {
                let size = size.map(|(w, h)| SizeHint::new(f32::from(w), f32::from(h)));
                let position = Position::new(f32::from(x), f32::from(y));
                let _ = session.on_contact_start(ContactId(u32::from(id)), position, size);
            }
            Op::Move { id, x, y } => {
                session.on_contact_move(
                    ContactId(u32::from(id)),
                    Position::new(f32::from(x), f32::from(y)),
                );
            }
            Op::Release { id } => {
                session.on_contact_end(ContactId(u32::from(id)));
            }
            Op::Advance { ms } => session.advance_by(Duration::from_millis(u64::from(ms))),
            Op::Frame => {
                session.frame();
            }
            Op::SetMode { contact_pick } => {
                let mode = if contact_pick {
                    Mode::ContactPick
                } else {
                    Mode::CountEntry
                };
                session.request_mode(mode);
            }
            Op::Reset => session.reset(),
            Op::Force { active } => {
                session.force_selection_active(active);
            }
            Op::DeviceLimit { points } => {
                session.set_device_max_touch_points(points.map(u32::from));
            }
        }

        if let Err(broken) = session.check_invariants() {
            panic!("invariant violated: {broken}");
        }
        assert_eq!(session.selection_active(), session.winner().is_some());
        assert!(session.active_count() <= session.max_contacts());
        assert!(!(session.selection_active() && session.is_armed()));
    }

    let _ = session.drain_notices();
});
