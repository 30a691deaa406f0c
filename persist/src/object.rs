//! The host serialization contract.
//!
//! The [`Persist`] trait is what a persistable object implements so the
//! walk can reach its fields. Use `#[derive(Persist)]` from
//! [`persist_macro`] to generate the field table and member dispatch.

use crate::schema::FieldInfo;
use crate::serialize::{DeserializeContext, FieldError, SerializeContext, SerializeError};

/// Trait for objects that take part in a save or load walk.
///
/// The derive macro generates a static [`FieldInfo`] table plus
/// [`write_member`](Self::write_member) / [`read_member`](Self::read_member)
/// dispatch arms. The default [`save`](Self::save) and [`load`](Self::load)
/// run the automatic member walk over that table, resolving each eligible
/// field's wire name for the active schema version.
///
/// # Deriving
///
/// ```ignore
/// #[derive(Default, Persist)]
/// struct Player {
///     pub name: String,
///     #[persist(version = 1, name = "score")]
///     #[persist(version = 2, name = "points", formerly = "score")]
///     pub points: u32,
///     #[persist(version = 3, removed)]
///     pub ammo: u32,
/// }
/// ```
///
/// # Custom logic
///
/// Mark the struct `#[persist(custom)]` and implement the trait by hand.
/// Overrides of `save`/`load` may mix `ctx.write_members(self)` with
/// explicit `ctx.write` / `ctx.read` calls:
///
/// ```ignore
/// impl Persist for Inventory {
///     const NAME: &'static str = "Inventory";
///
///     fn save(&self, ctx: &mut SerializeContext<'_>) -> Result<(), SerializeError> {
///         ctx.write("slots", &self.slots)?;
///         ctx.write_serde("checksum", &self.checksum())
///     }
///
///     fn load(&mut self, ctx: &mut DeserializeContext<'_>) -> Result<(), FieldError> {
///         ctx.read("slots", &mut self.slots);
///         Ok(())
///     }
/// }
/// ```
pub trait Persist: Sized + 'static {
    /// The struct name as a static string (e.g. `"Player"`).
    const NAME: &'static str;

    /// Static per-field metadata, in declaration order.
    fn field_table() -> &'static [FieldInfo] {
        &[]
    }

    /// Write the member declared as `member` under the wire name `name`.
    ///
    /// Unknown members are ignored.
    fn write_member(
        &self,
        _member: &str,
        _name: &str,
        _ctx: &mut SerializeContext<'_>,
    ) -> Result<(), SerializeError> {
        Ok(())
    }

    /// Read the member declared as `member` from the wire name `name`.
    ///
    /// Returns `true` if the document carried the field and it decoded.
    fn read_member(
        &mut self,
        _member: &str,
        _name: &str,
        _ctx: &mut DeserializeContext<'_>,
    ) -> bool {
        false
    }

    /// Write every persisted field into the current document node.
    fn save(&self, ctx: &mut SerializeContext<'_>) -> Result<(), SerializeError> {
        ctx.write_members(self)
    }

    /// Read every persisted field from the current document node.
    ///
    /// Called once per load phase.
    fn load(&mut self, ctx: &mut DeserializeContext<'_>) -> Result<(), FieldError> {
        ctx.read_members(self);
        Ok(())
    }
}
