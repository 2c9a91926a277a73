// Instruction-level behaviour of the virtual machine, driven through the public API
mod common;

use common::{step_n, StoryBuilder};
use magnetic::error::VmError;
use magnetic::host_headless::HeadlessHost;

#[test]
fn test_addressing_modes_advance_pc() {
    let mut vm = StoryBuilder::new(2)
        .words(
            0,
            &[
                0x3228, 0x0100, // move.w $100(a0),d1
                0x243c, 0x1234, 0x5678, // move.l #$12345678,d2
                0x163c, 0x00ab, // move.b #$ab,d3
                0x3830, 0x0102, // move.w 2(a0,d0.w),d4
                0x3a39, 0x0000, 0x0100, // move.w $100.l,d5
            ],
        )
        .words(0x100, &[0xbeef])
        .build();
    let mut host = HeadlessHost::new();

    let expected_pc = [4, 10, 14, 18, 24];
    for (i, &pc) in expected_pc.iter().enumerate() {
        step_n(&mut vm, &mut host, 1);
        assert_eq!(vm.registers().pc, pc, "pc after instruction {}", i);
    }

    let regs = vm.registers();
    assert_eq!(regs.d(1), 0xbeef);
    assert_eq!(regs.d(2), 0x1234_5678);
    assert_eq!(regs.d(3), 0xab);
    assert_eq!(regs.d(4), 0x0100, "indexed read picks up the first displacement word");
    assert_eq!(regs.d(5), 0xbeef);
}

#[test]
fn test_move_to_address_register_flags_by_version() {
    // moveq #-1,d0 ; movea.l d1,a0
    let code = [0x70ff, 0x2041];

    let mut early = StoryBuilder::new(1).words(0, &code).build();
    let mut host = HeadlessHost::new();
    step_n(&mut early, &mut host, 2);
    let flags = early.registers().flags;
    assert!(flags.zero, "format 1 sets flags from the moved value");
    assert!(!flags.negative);

    let mut later = StoryBuilder::new(2).words(0, &code).build();
    step_n(&mut later, &mut host, 2);
    let flags = later.registers().flags;
    assert!(!flags.zero, "format 2 leaves the flags from moveq");
    assert!(flags.negative);
    assert_eq!(later.registers().a(0), 0);
}

#[test]
fn test_addq_flags_by_version() {
    // moveq #-1,d0 ; addq.w #1,d0
    let code = [0x70ff, 0x5240];

    let mut v2 = StoryBuilder::new(2).words(0, &code).build();
    let mut host = HeadlessHost::new();
    step_n(&mut v2, &mut host, 2);
    assert_eq!(v2.registers().d(0), 0xffff_0000);
    let flags = v2.registers().flags;
    assert!(flags.zero);
    assert!(!flags.negative);
    assert!(flags.carry);

    let mut v3 = StoryBuilder::new(3).words(0, &code).build();
    step_n(&mut v3, &mut host, 2);
    assert_eq!(v3.registers().d(0), 0xffff_0000);
    let flags = v3.registers().flags;
    assert!(!flags.zero, "quick forms keep N and Z from format 3 on");
    assert!(flags.negative);
    assert!(flags.carry, "carry is still updated");
}

#[test]
fn test_add_and_sub_set_flags() {
    let mut vm = StoryBuilder::new(3)
        .words(
            0,
            &[
                0x7005, // moveq #5,d0
                0x7205, // moveq #5,d1
                0x9041, // sub.w d1,d0
                0x7403, // moveq #3,d2
                0x9042, // sub.w d2,d0
                0xd041, // add.w d1,d0
            ],
        )
        .build();
    let mut host = HeadlessHost::new();

    step_n(&mut vm, &mut host, 3);
    assert!(vm.registers().flags.zero);
    assert!(!vm.registers().flags.carry);

    step_n(&mut vm, &mut host, 2);
    assert_eq!(vm.registers().d(0) & 0xffff, 0xfffd);
    assert!(vm.registers().flags.negative);
    assert!(vm.registers().flags.carry, "borrow sets carry");

    step_n(&mut vm, &mut host, 1);
    assert_eq!(vm.registers().d(0) & 0xffff, 0x0002);
    assert!(!vm.registers().flags.negative);
    assert!(vm.registers().flags.carry, "wrap past zero sets carry");
}

#[test]
fn test_subroutine_call_and_return() {
    let mut vm = StoryBuilder::new(2)
        .words(0, &[0x6104, 0xa0ed, 0x0000, 0x7007, 0x4e75])
        .build();
    let mut host = HeadlessHost::new();

    step_n(&mut vm, &mut host, 1);
    assert_eq!(vm.registers().pc, 6);
    assert_eq!(vm.registers().sp(), 0xfffe - 4);

    step_n(&mut vm, &mut host, 3);
    assert_eq!(vm.registers().d(0), 7);
    assert_eq!(vm.registers().sp(), 0xfffe);
    assert!(!vm.is_running(), "stop after returning");
}

#[test]
fn test_dbf_loop_counts_down() {
    // moveq #3,d0 ; loop: addq.w #1,d1 ; dbf d0,loop
    let mut vm = StoryBuilder::new(2)
        .words(0, &[0x7003, 0x5241, 0x51c8, 0xfffc, 0xa0ed])
        .build();
    let mut host = HeadlessHost::new();
    let executed = vm.run(&mut host, Some(100));
    assert_eq!(vm.registers().d(1), 4);
    assert_eq!(vm.registers().d(0) & 0xffff, 0xffff);
    assert_eq!(executed, 1 + 4 * 2 + 1);
    assert!(!vm.is_running());
}

#[test]
fn test_divide_by_zero_is_fatal() {
    // divu d1,d0 with d1 = 0
    let mut vm = StoryBuilder::new(2).words(0, &[0x80c1]).build();
    let mut host = HeadlessHost::new();
    assert!(matches!(vm.execute_one(&mut host), Err(VmError::DivideByZero)));

    let mut vm = StoryBuilder::new(2).words(0, &[0x80c1]).build();
    assert!(!vm.step(&mut host));
    assert!(host.fatal.is_some());
}

#[test]
fn test_unimplemented_opcode_reports_pc() {
    // movep is not part of the machine
    let mut vm = StoryBuilder::new(2).words(0, &[0x4e71, 0x0108]).build();
    let mut host = HeadlessHost::new();
    step_n(&mut vm, &mut host, 1);
    let err = vm.execute_one(&mut host).unwrap_err();
    assert!(err.to_string().contains("0108"), "message was: {}", err);
}

#[test]
fn test_restart_restores_memory_and_registers() {
    // addq.w #1,$200.w ; moveq #9,d3 ; restart
    let mut vm = StoryBuilder::new(2)
        .words(0, &[0x5278, 0x0200, 0x7609, 0xa0ee])
        .build();
    let mut host = HeadlessHost::new();
    step_n(&mut vm, &mut host, 2);
    assert_eq!(vm.memory().read_u16(0x200).unwrap(), 1);
    assert_eq!(vm.registers().d(3), 9);

    step_n(&mut vm, &mut host, 1);
    assert_eq!(vm.memory().read_u16(0x200).unwrap(), 0);
    assert_eq!(vm.registers().d(3), 0);
    assert_eq!(vm.registers().pc, 0);
    assert!(vm.is_running());
    assert_eq!(host.pictures.last().map(|p| p.mode), Some(0), "pictures cleared");
}
