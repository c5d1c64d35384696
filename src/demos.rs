//! Built-in robot programs, runnable from the command line.

use crate::program::{Botball, ProgramRegistry, ProgramResult};

/// Name and one-line description of every built-in program
pub const DEMOS: &[(&str, &str)] = &[
    ("wander", "Open-loop drive with timed turns"),
    ("square", "Closed-loop square using position moves"),
    ("bump", "Create drives until a bumper hits, backs off and turns"),
    ("multitask", "Counter, servo sweep and a timed shutdown in parallel"),
];

/// Registry whose `main` is the named demo, or None if there is no such demo
pub fn registry(name: &str) -> Option<ProgramRegistry> {
    let registry = ProgramRegistry::new();
    let registry = match name {
        "wander" => registry.with("main", wander),
        "square" => registry.with("main", square),
        "bump" => registry.with("main", bump),
        "multitask" => registry.with("main", multitask).with("sweep", sweep),
        _ => return None,
    };
    Some(registry)
}

fn wander(bb: &Botball) -> ProgramResult {
    bb.print("Wandering\n")?;
    for _ in 0..4 {
        bb.motor(0, 80)?;
        bb.motor(3, 80)?;
        bb.msleep(1500)?;
        bb.motor(0, -60)?;
        bb.motor(3, 60)?;
        bb.msleep(700)?;
    }
    bb.ao()?;
    bb.print("Done\n")
}

fn square(bb: &Botball) -> ProgramResult {
    for side in 1..=4 {
        bb.mrp(0, 600, 1300)?;
        bb.mrp(3, 600, 1300)?;
        bb.bmd(0)?;
        bb.bmd(3)?;
        bb.mrp(0, 600, -420)?;
        bb.mrp(3, 600, 420)?;
        bb.bmd(0)?;
        bb.bmd(3)?;
        bb.print(format!("Side {} at {}\n", side, bb.get_motor_position_counter(0)?))?;
    }
    bb.ao()
}

fn bump(bb: &Botball) -> ProgramResult {
    if bb.create_connect()? != 0 {
        return Ok(());
    }
    bb.create_drive_straight(250)?;
    loop {
        bb.create_bumpdrop()?;
        let sensors = bb.create_state().sensors;
        if sensors.lbump == 1 || sensors.rbump == 1 {
            bb.print(format!("Bump {} {}\n", sensors.lbump, sensors.rbump))?;
            break;
        }
        bb.msleep(20)?;
    }
    bb.create_drive_straight(-150)?;
    bb.msleep(600)?;
    bb.create_spin_block(150, 90)?;
    bb.create_disconnect()
}

fn multitask(bb: &Botball) -> ProgramResult {
    bb.enable_servos()?;
    bb.start_process("sweep")?;
    bb.shut_down_in(2.0)?;
    let mut count = 0;
    loop {
        bb.print(format!("{} ", count))?;
        count += 1;
        bb.msleep(250)?;
    }
}

fn sweep(bb: &Botball) -> ProgramResult {
    loop {
        for position in [200, 1800] {
            bb.set_servo_position(0, position)?;
            bb.msleep(400)?;
        }
    }
}
