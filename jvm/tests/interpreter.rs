//! End-to-end interpreter tests: each case assembles real class files into
//! a scratch directory and runs them through the public entry point.

mod common;

use class_format::{AccessFlags, Constant, Opcode};
use common::*;
use jvm::VmError;
use tempfile::TempDir;

const INSTANCE_METHOD: AccessFlags = AccessFlags::PUBLIC;

fn main_flags() -> AccessFlags {
    AccessFlags::PUBLIC | AccessFlags::STATIC
}

/// getstatic System.out / ldc "Hello" / invokevirtual println
#[test]
fn hello_world() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Hi", "java/lang/Object");

    let out = class.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let hello = class.string("Hello");
    let println = class.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");

    let mut code = vec![op(Opcode::Getstatic)];
    code.extend_from_slice(&out.to_be_bytes());
    code.push(op(Opcode::Ldc));
    code.push(hello as u8);
    code.push(op(Opcode::Invokevirtual));
    code.extend_from_slice(&println.to_be_bytes());
    code.push(op(Opcode::Return));

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 2, 1, code);
    class.write_to(dir.path(), "Hi");

    let (env, result) = run_class(dir.path(), "Hi", &[]);
    result.unwrap();
    assert_eq!(console_output(&env), "\nHello");
}

/// 1 + 2 + 3 through iconst/iadd, printed as an int.
#[test]
fn integer_sum() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Sum", "java/lang/Object");

    let out = class.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let println = class.method_ref("java/io/PrintStream", "println", "(I)V");

    let mut code = vec![op(Opcode::Getstatic)];
    code.extend_from_slice(&out.to_be_bytes());
    code.extend_from_slice(&[
        op(Opcode::Iconst1),
        op(Opcode::Iconst2),
        op(Opcode::Iadd),
        op(Opcode::Iconst3),
        op(Opcode::Iadd),
        op(Opcode::Invokevirtual),
    ]);
    code.extend_from_slice(&println.to_be_bytes());
    code.push(op(Opcode::Return));

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 3, 1, code);
    class.write_to(dir.path(), "Sum");

    let (env, result) = run_class(dir.path(), "Sum", &[]);
    result.unwrap();
    assert_eq!(console_output(&env), "\n6");
}

/// Sum of 1..=10 with locals, iinc, if_icmple and a backward branch.
#[test]
fn for_loop() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Loop", "java/lang/Object");

    let out = class.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let println = class.method_ref("java/io/PrintStream", "println", "(I)V");

    #[rustfmt::skip]
    let mut code = vec![
        op(Opcode::Iconst0),             //  0: sum = 0
        op(Opcode::Istore1),             //  1
        op(Opcode::Iconst1),             //  2: i = 1
        op(Opcode::Istore2),             //  3
        op(Opcode::Iload1),              //  4: sum += i
        op(Opcode::Iload2),              //  5
        op(Opcode::Iadd),                //  6
        op(Opcode::Istore1),             //  7
        op(Opcode::Iinc), 2, 1,          //  8: i += 1
        op(Opcode::Iload2),              // 11
        op(Opcode::Bipush), 10,          // 12
        op(Opcode::IfIcmple), 0xFF, 0xF6, // 14: i <= 10 -> 4
        op(Opcode::Getstatic),           // 17
    ];
    code.extend_from_slice(&out.to_be_bytes());
    code.push(op(Opcode::Iload1)); // 20
    code.push(op(Opcode::Invokevirtual)); // 21
    code.extend_from_slice(&println.to_be_bytes());
    code.push(op(Opcode::Return)); // 24

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 2, 3, code);
    class.write_to(dir.path(), "Loop");

    let (env, result) = run_class(dir.path(), "Loop", &[]);
    result.unwrap();
    assert_eq!(console_output(&env), "\n55");
}

/// Loading the main class pulls in its super, whose `<clinit>` runs before
/// the first instruction of `main`.
#[test]
fn static_init_ordering_across_super() {
    let dir = TempDir::new().unwrap();

    // class A { static int X; static { X = 7; } }
    let mut a = ClassAssembler::new("A", "java/lang/Object");
    a.add_field(AccessFlags::PUBLIC | AccessFlags::STATIC, "X", "I");
    let x_ref = a.field_ref("A", "X", "I");
    let mut clinit = vec![op(Opcode::Bipush), 7, op(Opcode::Putstatic)];
    clinit.extend_from_slice(&x_ref.to_be_bytes());
    clinit.push(op(Opcode::Return));
    a.add_method(main_flags(), "<clinit>", "()V", 1, 0, clinit);
    a.write_to(dir.path(), "A");

    // class B extends A { main prints A.X }
    let mut b = ClassAssembler::new("B", "A");
    let out = b.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let x_ref = b.field_ref("A", "X", "I");
    let println = b.method_ref("java/io/PrintStream", "println", "(I)V");

    let mut code = vec![op(Opcode::Getstatic)];
    code.extend_from_slice(&out.to_be_bytes());
    code.push(op(Opcode::Getstatic));
    code.extend_from_slice(&x_ref.to_be_bytes());
    code.push(op(Opcode::Invokevirtual));
    code.extend_from_slice(&println.to_be_bytes());
    code.push(op(Opcode::Return));
    b.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 2, 1, code);
    b.write_to(dir.path(), "B");

    let (env, result) = run_class(dir.path(), "B", &[]);
    result.unwrap();
    assert_eq!(console_output(&env), "\n7");
    assert_eq!(static_int(&env, "A", "X"), 7);
}

/// A subclass `<clinit>` that reads its super's statics sees the super
/// already initialized, and the instruction that triggered the load
/// re-executes afterwards.
#[test]
fn clinit_chain_runs_super_first() {
    let dir = TempDir::new().unwrap();

    // class Sup { static int S; static { S = 5; } }
    let mut sup = ClassAssembler::new("Sup", "java/lang/Object");
    sup.add_field(AccessFlags::PUBLIC | AccessFlags::STATIC, "S", "I");
    let s_ref = sup.field_ref("Sup", "S", "I");
    let mut clinit = vec![op(Opcode::Bipush), 5, op(Opcode::Putstatic)];
    clinit.extend_from_slice(&s_ref.to_be_bytes());
    clinit.push(op(Opcode::Return));
    sup.add_method(main_flags(), "<clinit>", "()V", 1, 0, clinit);
    sup.write_to(dir.path(), "Sup");

    // class Sub extends Sup { static int T; static { T = Sup.S + 1; } }
    let mut sub = ClassAssembler::new("Sub", "Sup");
    sub.add_field(AccessFlags::PUBLIC | AccessFlags::STATIC, "T", "I");
    let s_ref = sub.field_ref("Sup", "S", "I");
    let t_ref = sub.field_ref("Sub", "T", "I");
    let mut clinit = vec![op(Opcode::Getstatic)];
    clinit.extend_from_slice(&s_ref.to_be_bytes());
    clinit.extend_from_slice(&[op(Opcode::Iconst1), op(Opcode::Iadd), op(Opcode::Putstatic)]);
    clinit.extend_from_slice(&t_ref.to_be_bytes());
    clinit.push(op(Opcode::Return));
    sub.add_method(main_flags(), "<clinit>", "()V", 2, 0, clinit);
    sub.write_to(dir.path(), "Sub");

    // class UseChain { main prints Sub.T }
    let mut user = ClassAssembler::new("UseChain", "java/lang/Object");
    let out = user.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let t_ref = user.field_ref("Sub", "T", "I");
    let println = user.method_ref("java/io/PrintStream", "println", "(I)V");

    let mut code = vec![op(Opcode::Getstatic)];
    code.extend_from_slice(&out.to_be_bytes());
    code.push(op(Opcode::Getstatic));
    code.extend_from_slice(&t_ref.to_be_bytes());
    code.push(op(Opcode::Invokevirtual));
    code.extend_from_slice(&println.to_be_bytes());
    code.push(op(Opcode::Return));
    user.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 2, 1, code);
    user.write_to(dir.path(), "UseChain");

    let (env, result) = run_class(dir.path(), "UseChain", &[]);
    result.unwrap();
    assert_eq!(console_output(&env), "\n6");
    assert_eq!(static_int(&env, "Sup", "S"), 5);
    assert_eq!(static_int(&env, "Sub", "T"), 6);
}

/// getfield through a null reference aborts with NullPointerException.
#[test]
fn null_dereference() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Npe", "java/lang/Object");
    class.add_field(AccessFlags::PUBLIC, "f", "I");

    let f_ref = class.field_ref("Npe", "f", "I");
    let mut code = vec![op(Opcode::AconstNull), op(Opcode::Getfield)];
    code.extend_from_slice(&f_ref.to_be_bytes());
    code.extend_from_slice(&[op(Opcode::Pop), op(Opcode::Return)]);

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 2, 1, code);
    class.write_to(dir.path(), "Npe");

    let (_env, result) = run_class(dir.path(), "Npe", &[]);
    assert!(matches!(result, Err(VmError::NullPointer)));
}

/// Storing past the end of an int[3] aborts with
/// ArrayIndexOutOfBoundsException.
#[test]
fn array_store_out_of_bounds() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Oob", "java/lang/Object");

    #[rustfmt::skip]
    let code = vec![
        op(Opcode::Iconst3),
        op(Opcode::Newarray), 10, // T_INT
        op(Opcode::Astore1),
        op(Opcode::Aload1),
        op(Opcode::Iconst5),
        op(Opcode::Iconst1),
        op(Opcode::Iastore),
        op(Opcode::Return),
    ];

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 3, 2, code);
    class.write_to(dir.path(), "Oob");

    let (_env, result) = run_class(dir.path(), "Oob", &[]);
    assert!(matches!(
        result,
        Err(VmError::IndexOutOfBounds { index: 5, length: 3 })
    ));
}

/// In-bounds array traffic round-trips values.
#[test]
fn array_store_and_load() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Arr", "java/lang/Object");
    class.add_field(AccessFlags::PUBLIC | AccessFlags::STATIC, "r", "I");
    let r_ref = class.field_ref("Arr", "r", "I");

    #[rustfmt::skip]
    let mut code = vec![
        op(Opcode::Iconst3),
        op(Opcode::Newarray), 10,       // new int[3]
        op(Opcode::Astore1),
        op(Opcode::Aload1),
        op(Opcode::Iconst1),
        op(Opcode::Bipush), 41,
        op(Opcode::Iastore),            // a[1] = 41
        op(Opcode::Aload1),
        op(Opcode::Iconst1),
        op(Opcode::Iaload),             // a[1]
        op(Opcode::Aload1),
        op(Opcode::Arraylength),
        op(Opcode::Iadd),               // 41 + 3
        op(Opcode::Putstatic),
    ];
    code.extend_from_slice(&r_ref.to_be_bytes());
    code.push(op(Opcode::Return));

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 3, 2, code);
    class.write_to(dir.path(), "Arr");

    let (env, result) = run_class(dir.path(), "Arr", &[]);
    result.unwrap();
    assert_eq!(static_int(&env, "Arr", "r"), 44);
}

/// Virtual dispatch resolves to the closest ancestor implementation.
#[test]
fn virtual_resolution_picks_closest_ancestor() {
    let dir = TempDir::new().unwrap();

    let mut base = ClassAssembler::new("Base", "java/lang/Object");
    base.add_method(
        INSTANCE_METHOD,
        "m",
        "()I",
        1,
        1,
        vec![op(Opcode::Iconst1), op(Opcode::Ireturn)],
    );
    base.write_to(dir.path(), "Base");

    let mut mid = ClassAssembler::new("Mid", "Base");
    mid.add_method(
        INSTANCE_METHOD,
        "m",
        "()I",
        1,
        1,
        vec![op(Opcode::Iconst2), op(Opcode::Ireturn)],
    );
    mid.write_to(dir.path(), "Mid");

    let leaf = ClassAssembler::new("Leaf", "Mid");
    leaf.write_to(dir.path(), "Leaf");

    let mut test = ClassAssembler::new("VirtualTest", "java/lang/Object");
    test.add_field(AccessFlags::PUBLIC | AccessFlags::STATIC, "r", "I");
    let leaf_class = "Leaf";
    let m_ref = test.method_ref(leaf_class, "m", "()I");
    let leaf_index = test.class(leaf_class);
    let r_ref = test.field_ref("VirtualTest", "r", "I");

    let mut code = vec![op(Opcode::New)];
    code.extend_from_slice(&leaf_index.to_be_bytes());
    code.push(op(Opcode::Invokevirtual));
    code.extend_from_slice(&m_ref.to_be_bytes());
    code.push(op(Opcode::Putstatic));
    code.extend_from_slice(&r_ref.to_be_bytes());
    code.push(op(Opcode::Return));

    test.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 2, 1, code);
    test.write_to(dir.path(), "VirtualTest");

    let (env, result) = run_class(dir.path(), "VirtualTest", &[]);
    result.unwrap();
    assert_eq!(static_int(&env, "VirtualTest", "r"), 2);
}

/// tableswitch and lookupswitch: keys in range hit their target, keys
/// outside land on the default.
#[test]
fn switches() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Switches", "java/lang/Object");

    for field in ["r1", "r2", "r3", "r4", "r5"] {
        class.add_field(AccessFlags::PUBLIC | AccessFlags::STATIC, field, "I");
    }

    // static int pick(int key): tableswitch over 1..=3.
    #[rustfmt::skip]
    let mut pick = vec![
        op(Opcode::Iload0),       //  0
        op(Opcode::Tableswitch),  //  1
        0, 0,                     //  2: padding to a 4-byte boundary
    ];
    pick.extend_from_slice(&36i32.to_be_bytes()); //  4: default -> 37
    pick.extend_from_slice(&1i32.to_be_bytes()); //  8: low
    pick.extend_from_slice(&3i32.to_be_bytes()); // 12: high
    pick.extend_from_slice(&27i32.to_be_bytes()); // 16: 1 -> 28
    pick.extend_from_slice(&30i32.to_be_bytes()); // 20: 2 -> 31
    pick.extend_from_slice(&33i32.to_be_bytes()); // 24: 3 -> 34
    pick.extend_from_slice(&[
        op(Opcode::Bipush), 10, op(Opcode::Ireturn), // 28
        op(Opcode::Bipush), 20, op(Opcode::Ireturn), // 31
        op(Opcode::Bipush), 30, op(Opcode::Ireturn), // 34
        op(Opcode::Bipush), 99, op(Opcode::Ireturn), // 37
    ]);
    class.add_method(main_flags(), "pick", "(I)I", 1, 1, pick);

    // static int sel(int key): lookupswitch over {10, 1000}.
    #[rustfmt::skip]
    let mut sel = vec![
        op(Opcode::Iload0),        //  0
        op(Opcode::Lookupswitch),  //  1
        0, 0,                      //  2: padding to a 4-byte boundary
    ];
    sel.extend_from_slice(&31i32.to_be_bytes()); //  4: default -> 32
    sel.extend_from_slice(&2i32.to_be_bytes()); //  8: npairs
    sel.extend_from_slice(&10i32.to_be_bytes()); // 12: match 10
    sel.extend_from_slice(&27i32.to_be_bytes()); // 16: -> 28
    sel.extend_from_slice(&1000i32.to_be_bytes()); // 20: match 1000
    sel.extend_from_slice(&29i32.to_be_bytes()); // 24: -> 30
    sel.extend_from_slice(&[
        op(Opcode::Iconst1), op(Opcode::Ireturn), // 28..=29
        op(Opcode::Iconst2), op(Opcode::Ireturn), // 30..=31
        op(Opcode::Bipush), 99, op(Opcode::Ireturn), // 32..=34
    ]);
    class.add_method(main_flags(), "sel", "(I)I", 1, 1, sel);

    let pick_ref = class.method_ref("Switches", "pick", "(I)I");
    let sel_ref = class.method_ref("Switches", "sel", "(I)I");

    let mut main = Vec::new();
    let mut call = |code: &mut Vec<u8>, push: &[u8], method: u16, target: u16| {
        code.extend_from_slice(push);
        code.push(op(Opcode::Invokestatic));
        code.extend_from_slice(&method.to_be_bytes());
        code.push(op(Opcode::Putstatic));
        code.extend_from_slice(&target.to_be_bytes());
    };

    let r = [
        class.field_ref("Switches", "r1", "I"),
        class.field_ref("Switches", "r2", "I"),
        class.field_ref("Switches", "r3", "I"),
        class.field_ref("Switches", "r4", "I"),
        class.field_ref("Switches", "r5", "I"),
    ];

    call(&mut main, &[op(Opcode::Iconst2)], pick_ref, r[0]);
    call(&mut main, &[op(Opcode::Bipush), 5], pick_ref, r[1]);
    call(&mut main, &[op(Opcode::Bipush), 10], sel_ref, r[2]);
    call(&mut main, &[op(Opcode::Bipush), 7], sel_ref, r[3]);
    call(&mut main, &[op(Opcode::Sipush), 0x03, 0xE8], sel_ref, r[4]);
    main.push(op(Opcode::Return));

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 2, 1, main);
    class.write_to(dir.path(), "Switches");

    let (env, result) = run_class(dir.path(), "Switches", &[]);
    result.unwrap();
    assert_eq!(static_int(&env, "Switches", "r1"), 20);
    assert_eq!(static_int(&env, "Switches", "r2"), 99);
    assert_eq!(static_int(&env, "Switches", "r3"), 1);
    assert_eq!(static_int(&env, "Switches", "r4"), 99);
    assert_eq!(static_int(&env, "Switches", "r5"), 2);
}

/// ldc2_w / lstore / lload / ladd keep the full 64-bit pattern.
#[test]
fn long_arithmetic_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Longs", "java/lang/Object");
    class.add_field(AccessFlags::PUBLIC | AccessFlags::STATIC, "r", "J");

    let big = class.long(0x0123_4567_89AB_CDEF);
    let one = class.long(1);
    let r_ref = class.field_ref("Longs", "r", "J");

    let mut code = vec![op(Opcode::Ldc2W)];
    code.extend_from_slice(&big.to_be_bytes());
    code.push(op(Opcode::Lstore1));
    code.push(op(Opcode::Lload1));
    code.push(op(Opcode::Ldc2W));
    code.extend_from_slice(&one.to_be_bytes());
    code.push(op(Opcode::Ladd));
    code.push(op(Opcode::Putstatic));
    code.extend_from_slice(&r_ref.to_be_bytes());
    code.push(op(Opcode::Return));

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 4, 3, code);
    class.write_to(dir.path(), "Longs");

    let (env, result) = run_class(dir.path(), "Longs", &[]);
    result.unwrap();
    assert_eq!(static_long(&env, "Longs", "r"), 0x0123_4567_89AB_CDF0);
}

/// NaN comparisons: fcmpl pushes -1 on unordered, fcmpg pushes +1.
#[test]
fn float_compare_nan_contracts() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Floats", "java/lang/Object");

    for field in ["r1", "r2", "r3"] {
        class.add_field(AccessFlags::PUBLIC | AccessFlags::STATIC, field, "I");
    }

    let lo = class.float(1.5);
    let hi = class.float(2.5);
    let nan = class.float(f32::NAN);
    let r1 = class.field_ref("Floats", "r1", "I");
    let r2 = class.field_ref("Floats", "r2", "I");
    let r3 = class.field_ref("Floats", "r3", "I");

    let mut code = Vec::new();

    code.push(op(Opcode::Ldc));
    code.push(lo as u8);
    code.push(op(Opcode::Ldc));
    code.push(hi as u8);
    code.push(op(Opcode::Fcmpl));
    code.push(op(Opcode::Putstatic));
    code.extend_from_slice(&r1.to_be_bytes());

    code.push(op(Opcode::Ldc));
    code.push(nan as u8);
    code.push(op(Opcode::Fconst0));
    code.push(op(Opcode::Fcmpg));
    code.push(op(Opcode::Putstatic));
    code.extend_from_slice(&r2.to_be_bytes());

    code.push(op(Opcode::Ldc));
    code.push(nan as u8);
    code.push(op(Opcode::Fconst0));
    code.push(op(Opcode::Fcmpl));
    code.push(op(Opcode::Putstatic));
    code.extend_from_slice(&r3.to_be_bytes());

    code.push(op(Opcode::Return));

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 2, 1, code);
    class.write_to(dir.path(), "Floats");

    let (env, result) = run_class(dir.path(), "Floats", &[]);
    result.unwrap();
    assert_eq!(static_int(&env, "Floats", "r1"), -1);
    assert_eq!(static_int(&env, "Floats", "r2"), 1);
    assert_eq!(static_int(&env, "Floats", "r3"), -1);
}

/// Inherited instance fields are reachable through subclass instances.
#[test]
fn inherited_instance_fields() {
    let dir = TempDir::new().unwrap();

    let mut p = ClassAssembler::new("P", "java/lang/Object");
    p.add_field(AccessFlags::PUBLIC, "x", "I");
    p.write_to(dir.path(), "P");

    let q = ClassAssembler::new("Q", "P");
    q.write_to(dir.path(), "Q");

    let mut test = ClassAssembler::new("FieldsTest", "java/lang/Object");
    test.add_field(AccessFlags::PUBLIC | AccessFlags::STATIC, "r", "I");
    let q_index = test.class("Q");
    let x_ref = test.field_ref("P", "x", "I");
    let r_ref = test.field_ref("FieldsTest", "r", "I");

    let mut code = vec![op(Opcode::New)];
    code.extend_from_slice(&q_index.to_be_bytes());
    code.push(op(Opcode::Dup));
    code.extend_from_slice(&[op(Opcode::Bipush), 9]);
    code.push(op(Opcode::Putfield));
    code.extend_from_slice(&x_ref.to_be_bytes());
    code.push(op(Opcode::Getfield));
    code.extend_from_slice(&x_ref.to_be_bytes());
    code.push(op(Opcode::Putstatic));
    code.extend_from_slice(&r_ref.to_be_bytes());
    code.push(op(Opcode::Return));

    test.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 3, 1, code);
    test.write_to(dir.path(), "FieldsTest");

    let (env, result) = run_class(dir.path(), "FieldsTest", &[]);
    result.unwrap();
    assert_eq!(static_int(&env, "FieldsTest", "r"), 9);
}

/// StringBuffer lifecycle through the native bridge.
#[test]
fn string_buffer_append_chain() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Buffers", "java/lang/Object");

    let out = class.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let sb = class.class("java/lang/StringBuffer");
    let init = class.method_ref("java/lang/StringBuffer", "<init>", "()V");
    let append_str = class.method_ref(
        "java/lang/StringBuffer",
        "append",
        "(Ljava/lang/String;)Ljava/lang/StringBuffer;",
    );
    let append_int = class.method_ref(
        "java/lang/StringBuffer",
        "append",
        "(I)Ljava/lang/StringBuffer;",
    );
    let to_string = class.method_ref(
        "java/lang/StringBuffer",
        "toString",
        "()Ljava/lang/String;",
    );
    let println = class.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    let prefix = class.string("x=");

    let mut code = vec![op(Opcode::Getstatic)];
    code.extend_from_slice(&out.to_be_bytes());
    code.push(op(Opcode::New));
    code.extend_from_slice(&sb.to_be_bytes());
    code.push(op(Opcode::Dup));
    code.push(op(Opcode::Invokespecial));
    code.extend_from_slice(&init.to_be_bytes());
    code.push(op(Opcode::Ldc));
    code.push(prefix as u8);
    code.push(op(Opcode::Invokevirtual));
    code.extend_from_slice(&append_str.to_be_bytes());
    code.extend_from_slice(&[op(Opcode::Bipush), 42]);
    code.push(op(Opcode::Invokevirtual));
    code.extend_from_slice(&append_int.to_be_bytes());
    code.push(op(Opcode::Invokevirtual));
    code.extend_from_slice(&to_string.to_be_bytes());
    code.push(op(Opcode::Invokevirtual));
    code.extend_from_slice(&println.to_be_bytes());
    code.push(op(Opcode::Return));

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 4, 1, code);
    class.write_to(dir.path(), "Buffers");

    let (env, result) = run_class(dir.path(), "Buffers", &[]);
    result.unwrap();
    assert_eq!(console_output(&env), "\nx=42");
}

/// Final statics materialize from ConstantValue attributes on first read.
#[test]
fn constant_value_statics() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Consts", "java/lang/Object");

    class.add_const_field("C", "I", Constant::Int(1234));
    let s_value = class.utf8("ok");
    class.add_const_field(
        "S",
        "Ljava/lang/String;",
        Constant::String { string_index: s_value },
    );

    let out = class.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let c_ref = class.field_ref("Consts", "C", "I");
    let s_ref = class.field_ref("Consts", "S", "Ljava/lang/String;");
    let println_int = class.method_ref("java/io/PrintStream", "println", "(I)V");
    let println_str =
        class.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");

    let mut code = vec![op(Opcode::Getstatic)];
    code.extend_from_slice(&out.to_be_bytes());
    code.push(op(Opcode::Getstatic));
    code.extend_from_slice(&c_ref.to_be_bytes());
    code.push(op(Opcode::Invokevirtual));
    code.extend_from_slice(&println_int.to_be_bytes());

    code.push(op(Opcode::Getstatic));
    code.extend_from_slice(&out.to_be_bytes());
    code.push(op(Opcode::Getstatic));
    code.extend_from_slice(&s_ref.to_be_bytes());
    code.push(op(Opcode::Invokevirtual));
    code.extend_from_slice(&println_str.to_be_bytes());
    code.push(op(Opcode::Return));

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 2, 1, code);
    class.write_to(dir.path(), "Consts");

    let (env, result) = run_class(dir.path(), "Consts", &[]);
    result.unwrap();
    assert_eq!(console_output(&env), "\n1234\nok");
}

/// Program arguments arrive as a reference array of string handles in
/// local 0.
#[test]
fn program_arguments() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Echo", "java/lang/Object");

    let out = class.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let println = class.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");

    let mut code = vec![op(Opcode::Getstatic)];
    code.extend_from_slice(&out.to_be_bytes());
    code.extend_from_slice(&[
        op(Opcode::Aload0),
        op(Opcode::Iconst0),
        op(Opcode::Aaload),
        op(Opcode::Invokevirtual),
    ]);
    code.extend_from_slice(&println.to_be_bytes());
    code.push(op(Opcode::Return));

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 3, 1, code);
    class.write_to(dir.path(), "Echo");

    let (env, result) = run_class(dir.path(), "Echo", &["hi"]);
    result.unwrap();
    assert_eq!(console_output(&env), "\nhi");
}

/// instanceof walks the loaded hierarchy; null is never an instance.
#[test]
fn instanceof_walks_hierarchy() {
    let dir = TempDir::new().unwrap();

    let base = ClassAssembler::new("IBase", "java/lang/Object");
    base.write_to(dir.path(), "IBase");
    let mid = ClassAssembler::new("IMid", "IBase");
    mid.write_to(dir.path(), "IMid");

    let mut test = ClassAssembler::new("InstTest", "java/lang/Object");
    test.add_field(AccessFlags::PUBLIC | AccessFlags::STATIC, "r1", "I");
    test.add_field(AccessFlags::PUBLIC | AccessFlags::STATIC, "r2", "I");
    let mid_index = test.class("IMid");
    let base_index = test.class("IBase");
    let r1 = test.field_ref("InstTest", "r1", "I");
    let r2 = test.field_ref("InstTest", "r2", "I");

    let mut code = vec![op(Opcode::New)];
    code.extend_from_slice(&mid_index.to_be_bytes());
    code.push(op(Opcode::Instanceof));
    code.extend_from_slice(&base_index.to_be_bytes());
    code.push(op(Opcode::Putstatic));
    code.extend_from_slice(&r1.to_be_bytes());

    code.push(op(Opcode::AconstNull));
    code.push(op(Opcode::Instanceof));
    code.extend_from_slice(&base_index.to_be_bytes());
    code.push(op(Opcode::Putstatic));
    code.extend_from_slice(&r2.to_be_bytes());
    code.push(op(Opcode::Return));

    test.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 2, 1, code);
    test.write_to(dir.path(), "InstTest");

    let (env, result) = run_class(dir.path(), "InstTest", &[]);
    result.unwrap();
    assert_eq!(static_int(&env, "InstTest", "r1"), 1);
    assert_eq!(static_int(&env, "InstTest", "r2"), 0);
}

/// Integer division by zero is detected and aborts.
#[test]
fn division_by_zero_aborts() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("DivZero", "java/lang/Object");

    let code = vec![
        op(Opcode::Iconst1),
        op(Opcode::Iconst0),
        op(Opcode::Idiv),
        op(Opcode::Pop),
        op(Opcode::Return),
    ];

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 2, 1, code);
    class.write_to(dir.path(), "DivZero");

    let (_env, result) = run_class(dir.path(), "DivZero", &[]);
    assert!(matches!(result, Err(VmError::DivisionByZero)));
}

/// newarray with a negative count aborts.
#[test]
fn negative_array_size_aborts() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("NegArr", "java/lang/Object");

    let code = vec![
        op(Opcode::IconstM1),
        op(Opcode::Newarray),
        10,
        op(Opcode::Pop),
        op(Opcode::Return),
    ];

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 2, 1, code);
    class.write_to(dir.path(), "NegArr");

    let (_env, result) = run_class(dir.path(), "NegArr", &[]);
    assert!(matches!(result, Err(VmError::NegativeArraySize(-1))));
}

/// Bytes outside the version-48 instruction set abort with the opcode
/// named.
#[test]
fn unknown_opcode_aborts() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("BadOp", "java/lang/Object");

    class.add_method(
        main_flags(),
        "main",
        "([Ljava/lang/String;)V",
        1,
        1,
        vec![0xBA, op(Opcode::Return)],
    );
    class.write_to(dir.path(), "BadOp");

    let (_env, result) = run_class(dir.path(), "BadOp", &[]);
    assert!(matches!(
        result,
        Err(VmError::UnknownOpcode { opcode: 0xBA })
    ));
}

/// invokevirtual on a null receiver aborts before any frame is pushed.
#[test]
fn invoke_on_null_receiver() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("NullCall", "java/lang/Object");

    class.add_method(
        INSTANCE_METHOD,
        "m",
        "()V",
        1,
        1,
        vec![op(Opcode::Return)],
    );

    let m_ref = class.method_ref("NullCall", "m", "()V");
    let mut code = vec![op(Opcode::AconstNull), op(Opcode::Invokevirtual)];
    code.extend_from_slice(&m_ref.to_be_bytes());
    code.push(op(Opcode::Return));

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 1, 1, code);
    class.write_to(dir.path(), "NullCall");

    let (_env, result) = run_class(dir.path(), "NullCall", &[]);
    assert!(matches!(result, Err(VmError::NullPointer)));
}

/// dup/swap/dup_x1 shuffle raw slots as documented.
#[test]
fn stack_shuffles() {
    let dir = TempDir::new().unwrap();
    let mut class = ClassAssembler::new("Shuffle", "java/lang/Object");
    class.add_field(AccessFlags::PUBLIC | AccessFlags::STATIC, "r", "I");
    let r_ref = class.field_ref("Shuffle", "r", "I");

    // 1, 2 -> swap -> (2, 1) -> dup_x1 -> (1, 2, 1) -> isub (2-1) -> iadd (1+1)
    #[rustfmt::skip]
    let mut code = vec![
        op(Opcode::Iconst1),
        op(Opcode::Iconst2),
        op(Opcode::Swap),
        op(Opcode::DupX1),
        op(Opcode::Isub),
        op(Opcode::Iadd),
        op(Opcode::Putstatic),
    ];
    code.extend_from_slice(&r_ref.to_be_bytes());
    code.push(op(Opcode::Return));

    class.add_method(main_flags(), "main", "([Ljava/lang/String;)V", 3, 1, code);
    class.write_to(dir.path(), "Shuffle");

    let (env, result) = run_class(dir.path(), "Shuffle", &[]);
    result.unwrap();
    assert_eq!(static_int(&env, "Shuffle", "r"), 2);
}
