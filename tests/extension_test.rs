// Interpreter calls made by story code: text, parsing, files, music, hints and shortcuts
mod common;

use common::{sound_file, step_n, StoryBuilder};
use magnetic::host::FILE_OK;
use magnetic::host_headless::{HeadlessHost, DEFAULT_SAVE};

/// Bits read from the low end: `I`=1, end=00, `H`=010, `@`=011.
fn decode_table() -> Vec<u8> {
    let mut table = vec![0u8; 0x104];
    table[0x00] = 0x01;
    table[0x80] = 0x80 | b'I';
    table[0x01] = 0x80;
    table[0x81] = 0x02;
    table[0x02] = 0x80 | b'H';
    table[0x82] = 0x80 | b'@';
    table
}

#[test]
fn test_print_string_zero() {
    // moveq #0,d0 ; print string ; stop
    let mut vm = StoryBuilder::new(2)
        .words(0, &[0x7000, 0xa0e2, 0xa0ed])
        .strings(&[0x0a, 0x00], &decode_table())
        .build();
    let mut host = HeadlessHost::new();
    vm.run(&mut host, Some(10));
    assert_eq!(host.output(), "HI");
    assert!(!vm.registers().flags.carry);
}

#[test]
fn test_print_character_and_status() {
    // moveq #'a',d1 ; putc ; moveq #1,d3 ; moveq #'b',d1 ; putc ; stop
    let mut vm = StoryBuilder::new(2)
        .words(0, &[0x7261, 0xa0f0, 0x7601, 0x7262, 0xa0f0, 0xa0ed])
        .build();
    let mut host = HeadlessHost::new();
    vm.run(&mut host, None);
    assert_eq!(host.output(), "a");
    assert_eq!(host.status(), "B");
}

#[test]
fn test_read_line_and_look_up_word() {
    let code = [
        0x49f8, 0x1000, // lea $1000.w,a4
        0xa0e1, // read: getc
        0x0c01, 0x000a, // cmpi.b #10,d1
        0x6704, // beq.s done
        0x18c1, // move.b d1,(a4)+
        0x60f4, // bra.s read
        0x4214, // done: clr.b (a4)
        0x4df8, 0x1000, // lea $1000.w,a6
        0x45f8, 0x2000, // lea $2000.w,a2
        0xa0f1, // dictionary lookup
        0xa0ed, // stop
    ];
    let mut vm = StoryBuilder::new(2)
        .words(0, &code)
        .dict(b"NORT\xc8\x82SOUT\xc8\x81")
        .build();
    let mut host = HeadlessHost::with_input("south\n");
    vm.run(&mut host, Some(200));

    assert!(!vm.is_running());
    assert!(host.fatal.is_none(), "{:?}", host.fatal);
    assert_eq!(vm.memory().slice(0x1000, 6).unwrap(), b"south\0");
    // bank 1, word 0, then the end marker
    assert_eq!(vm.memory().read_u8(0x2001).unwrap(), 1);
    assert_eq!(vm.memory().read_u16(0x2002).unwrap(), 0);
    assert_eq!(vm.memory().read_u16(0x2004).unwrap(), 0xffff);
    assert!(!vm.registers().flags.zero);
    assert_eq!(vm.registers().a(5), 0x1005);
}

#[test]
fn test_end_of_input_stops_the_game() {
    // getc ; bra.s getc
    let mut vm = StoryBuilder::new(2).words(0, &[0xa0e1, 0x60fc]).build();
    let mut host = HeadlessHost::with_input("ab");
    let executed = vm.run(&mut host, Some(100));
    assert!(!vm.is_running());
    assert_eq!(executed, 5);
    assert!(host.fatal.is_none());
    assert!(host.flushes >= 3, "output flushed before every read");
}

#[test]
fn test_save_and_load_region() {
    let code = [
        0x41f8, 0x0300, // lea $300.w,a0
        0x7204, // moveq #4,d1
        0xa0f4, // save
        0x4298, // clr.l (a0)+
        0x41f8, 0x0300, // lea $300.w,a0
        0x7204, // moveq #4,d1
        0xa0f5, // load
        0xa0ed,
    ];
    let mut vm = StoryBuilder::new(2)
        .words(0, &code)
        .bytes(0x300, &[1, 2, 3, 4])
        .build();
    let mut host = HeadlessHost::new();

    step_n(&mut vm, &mut host, 3);
    assert_eq!(host.saves[DEFAULT_SAVE], vec![1, 2, 3, 4]);
    assert_eq!(vm.registers().read(1, magnetic::registers::Size::Byte), FILE_OK as u32);

    step_n(&mut vm, &mut host, 1);
    assert_eq!(vm.memory().read_u32(0x300).unwrap(), 0);

    step_n(&mut vm, &mut host, 3);
    assert_eq!(vm.memory().slice(0x300, 4).unwrap(), &[1, 2, 3, 4]);
    assert_eq!(vm.registers().d(1) & 0xff, FILE_OK as u32);
}

#[test]
fn test_load_without_save_fails() {
    // lea $300.w,a0 ; moveq #4,d1 ; load
    let mut vm = StoryBuilder::new(2)
        .words(0, &[0x41f8, 0x0300, 0x7204, 0xa0f5])
        .build();
    let mut host = HeadlessHost::new();
    step_n(&mut vm, &mut host, 3);
    assert_eq!(vm.registers().d(1) & 0xff, 1);
}

#[test]
fn test_line_f_calls_through_table() {
    let mut vm = StoryBuilder::new(2)
        .words(
            0,
            &[
                0x4bf8, 0x0600, // lea $600.w,a5
                0x7e00, // moveq #0,d7
                0xa0f8, // set up the shortcut table
                0xf000, // call entry 0
                0xa0ed,
            ],
        )
        .words(0x600, &[0x0700])
        .words(0x700, &[0x702a, 0x4e75]) // moveq #42,d0 ; rts
        .build();
    let mut host = HeadlessHost::new();
    let executed = vm.run(&mut host, Some(50));
    assert_eq!(vm.registers().d(0), 42);
    assert_eq!(executed, 7);
    assert!(host.fatal.is_none());
}

#[test]
fn test_line_f_outside_table_is_fatal() {
    let mut vm = StoryBuilder::new(2)
        .words(0, &[0x4bf8, 0x0600, 0x7e00, 0xa0f8, 0xf001])
        .build();
    let mut host = HeadlessHost::new();
    vm.run(&mut host, Some(50));
    assert!(host.fatal.is_some());
    assert!(!vm.is_running());
}

#[test]
fn test_random_number_is_reproducible() {
    // moveq #10,d1 ; random below d1
    let mut vm = StoryBuilder::new(2).words(0, &[0x720a, 0xa0f6]).build();
    let mut host = HeadlessHost::new();
    step_n(&mut vm, &mut host, 2);
    // the first value from seed 0 is 12345
    assert_eq!(vm.registers().d(1), 5);
}

#[test]
fn test_named_music() {
    // lea $400.w,a1 ; play ; stop
    let mut vm = StoryBuilder::new(4)
        .words(0, &[0x43f8, 0x0400, 0xa0fc, 0xa0ed])
        .bytes(0x400, b"theme\0")
        .build();
    vm.attach_sound(sound_file()).unwrap();
    let mut host = HeadlessHost::new();
    vm.run(&mut host, None);
    assert_eq!(host.tunes, vec![(5, 120)]);

    // an empty name stops the music
    vm.memory_mut().write_u8(0x400, 0).unwrap();
    vm.registers_mut().pc = 0;
    let mut host = HeadlessHost::new();
    step_n(&mut vm, &mut host, 2);
    assert_eq!(host.tunes, vec![(0, 0)]);
}

#[test]
fn test_hints_reach_the_host() {
    let mut hints = b"MaHt".to_vec();
    hints.extend_from_slice(&[1, 0, 1, 0, 2, 0, 3, 0]);
    hints.extend_from_slice(b"hi\0");
    hints.extend_from_slice(&[0, 0]);

    // hints ; stop
    let mut vm = StoryBuilder::new(4).words(0, &[0xa0fb, 0xa0ed]).build();
    vm.attach_hints(&hints).unwrap();
    assert_eq!(vm.hints().map(|h| h.len()), Some(1));
    let mut host = HeadlessHost::new();
    vm.run(&mut host, None);
    assert_eq!(host.hints_shown, 1);
    assert_eq!(vm.registers().d(1) & 0xff, 1);
}

#[test]
fn test_queries_report_capabilities() {
    // undo available? ; query ; stop
    let mut vm = StoryBuilder::new(4).words(0, &[0xa0fd, 0xa0de, 0xa0ed]).build();
    let mut host = HeadlessHost::new();
    vm.registers_mut().set_d(1, 0xff);
    step_n(&mut vm, &mut host, 1);
    assert_eq!(vm.registers().d(1) & 0xff, 0);
    step_n(&mut vm, &mut host, 1);
    assert_eq!(vm.registers().d(1) & 0xff, 1);
}
