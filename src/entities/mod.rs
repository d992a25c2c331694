// Entity Models
// "Identity persists, values change"
//
// Each entity has:
// - Stable identity (UUID) that never changes
// - A canonical identifier the import pipeline reconciles against
//   (member number / product name / officer name+position)

pub mod member;
pub mod officer;
pub mod product;

pub use member::{
    number_implies_life, Member, MemberStatus, GRACE_PERIOD_DAYS, LIFE_MEMBER_MARKER,
};
pub use officer::{Officer, Position};
pub use product::{Product, ProductCategory};
