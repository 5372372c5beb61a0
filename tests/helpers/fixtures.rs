//! Mapping table fixtures.

/// Official → intermediary table for 1.14.
pub const INTERMEDIARIES_1_14: &str = "v1\tofficial\tintermediary\n\
    CLASS\ta\tnet/minecraft/class_1\n\
    CLASS\tb\tnet/minecraft/class_2\n\
    METHOD\ta\t(Lb;)V\tc\tmethod_10\n\
    FIELD\ta\tI\td\tfield_20\n";

/// Official → intermediary table for 1.13, where the same classes carried
/// other obfuscated names.
pub const INTERMEDIARIES_1_13: &str = "v1\tofficial\tintermediary\n\
    CLASS\tx\tnet/minecraft/class_1\n\
    CLASS\ty\tnet/minecraft/class_2\n\
    METHOD\tx\t(Ly;)V\tz\tmethod_10\n";

/// Native (official → named) flat source.
pub const NATIVE_V1: &str = "v1\tofficial\tnamed\n\
    CLASS\ta\tnet/example/Foo\n\
    METHOD\ta\t(Lb;)V\tc\tconsume\n";

/// Intermediary-anchored enigma source.
pub const ANCHORED_ENIGMA: &str = "CLASS net/minecraft/class_1 net/example/Ignored\n\
    \tFIELD field_20 count I\n\
    \tMETHOD method_10 (Lnet/minecraft/class_2;)V\n\
    \t\tARG 1 other\n\
    CLASS net/minecraft/class_2 net/example/Bar\n\
    \tMETHOD method_99 gone ()V\n";

/// Supplier source carrying all three namespaces and a parameter name.
pub const SUPPLIER_V2: &str = "tiny\t2\t0\tofficial\tintermediary\tnamed\n\
    c\ta\tnet/minecraft/class_1\tnet/example/Foo\n\
    \tm\t(Lb;)V\tc\tmethod_10\tconsume\n\
    \t\tp\t1\t\t\tother\n\
    c\tb\tnet/minecraft/class_2\tnet/example/Bar\n";
